use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    wirefeed::app::run_cli(std::env::args().skip(1))
}

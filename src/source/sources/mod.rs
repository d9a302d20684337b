/// Provider that runs an external command and reads rows from its stdout.
pub mod command;
/// Provider that reads rows from a JSON file.
pub mod json_file;

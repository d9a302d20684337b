/// Hex-encoded content digest used as record identity.
/// Example: `0cc175b9c0f1b6a831c399e269772661`
pub type ContentHash = String;
/// Identifier for the provider that produced a batch.
/// Examples: `cls_telegraph`, `json_file`, `in_memory`
pub type ProviderId = String;
/// Column name in a provider row.
/// Examples: `content`, `发布日期`
pub type ColumnName = String;
/// Raw date/time text exactly as the provider supplied it.
/// Examples: `2025-03-02`, `09:31:00`, `2025-03-02 09:31:00`
pub type RawTimestamp = String;

mod record;

use proc_macro::TokenStream;

/// Derive macro for `shelf_sync::Record`.
///
/// # Usage
///
/// ```ignore
/// #[derive(Clone, Serialize, Deserialize, Record)]
/// #[record(collection = "reservations")]
/// struct Reservation {
///     #[serde(rename = "_id")]
///     #[record(id)]
///     pub id: String,
///     #[record(retain)]
///     pub book: Option<Populated<Book>>,
///     #[record(version)]
///     pub revision: Option<u64>,
/// }
/// ```
///
/// Struct attributes:
/// - `collection = "..."`: collection name (defaults to the snake_case struct name + "s")
/// - `envelope = "..."`: push payloads wrap the record under this key
///
/// Field attributes:
/// - `id`: the immutable key (defaults to a field named `id`)
/// - `version`: a `u64` or `Option<u64>` field used to reject stale snapshots
/// - `retain`: keep the prior value when an update omits this field
#[proc_macro_derive(Record, attributes(record))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    record::derive_record(input)
}

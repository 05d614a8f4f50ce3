use chrono::Utc;
use uuid::Uuid;

/// Generates a fresh binding id. Bindings are addressed by this id for
/// their entire lifetime, independent of the resource name assigned later.
pub fn generate_binding_id() -> String {
    Uuid::new_v4().to_string()
}

/// Current wall-clock time as Unix seconds, the unit every timestamp field
/// in this crate is stored in.
pub fn now_unix() -> i64 {
    Utc::now().timestamp()
}

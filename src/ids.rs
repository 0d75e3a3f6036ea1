use uuid::Uuid;

/// Source of fresh todo ids.
pub trait IdGenerator {
    fn next_id(&mut self) -> String;
}

/// Millisecond timestamp plus a random suffix, e.g. `1792395000123-9f1c2a7b`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimestampIdGenerator;

impl IdGenerator for TimestampIdGenerator {
    fn next_id(&mut self) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}-{}", chrono::Utc::now().timestamp_millis(), &suffix[..8])
    }
}

impl<F: FnMut() -> String> IdGenerator for F {
    fn next_id(&mut self) -> String {
        self()
    }
}

//! Deterministic job identity derived from `(user, intent, qualifier)`.

/// Suffix appended to an appointment's base id for its 24-hour-prior slot.
pub const REMINDER_SUFFIX: &str = "-reminder24";

/// The three components every job id is derived from.
///
/// The rendered id is the order-sensitive concatenation of the components,
/// kept bit-compatible with the deployed id space. The encoding is not
/// collision-proof on its own (`("ab","c")` and `("a","bc")` collide), so
/// callers must keep the components free of boundary ambiguity; this type
/// being the only way to mint an id keeps the components from being
/// interleaved by hand at call sites.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobKey {
    pub user_id: String,
    pub intent_name: String,
    pub qualifier: String,
}

impl JobKey {
    pub fn new(user_id: &str, intent_name: &str, qualifier: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            intent_name: intent_name.to_string(),
            qualifier: qualifier.to_string(),
        }
    }

    /// The stable base id: `user_id + intent_name + qualifier`.
    pub fn id(&self) -> String {
        format!("{}{}{}", self.user_id, self.intent_name, self.qualifier)
    }

    /// Id of the derived 24-hour-prior reminder slot.
    pub fn reminder_id(&self) -> String {
        reminder_id(&self.id())
    }
}

/// Append the fixed reminder suffix to a base id.
pub fn reminder_id(base: &str) -> String {
    format!("{base}{REMINDER_SUFFIX}")
}

/// The fixed pair of slot ids an appointment occupies: `[main, reminder]`.
/// Query and cancel operate on both, whatever is actually stored.
pub fn appointment_slot_ids(base: &str) -> [String; 2] {
    [base.to_string(), reminder_id(base)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_id_is_plain_concatenation() {
        let key = JobKey::new("u1", "take_pill", "m");
        assert_eq!(key.id(), "u1take_pillm");
    }

    #[test]
    fn same_components_same_id() {
        let a = JobKey::new("u1", "visit", "a");
        let b = JobKey::new("u1", "visit", "a");
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn reminder_id_appends_fixed_suffix() {
        let key = JobKey::new("u1", "visit", "a");
        assert_eq!(key.reminder_id(), "u1visita-reminder24");
    }

    #[test]
    fn appointment_slots_are_main_then_reminder() {
        let [main, reminder] = appointment_slot_ids("u1visita");
        assert_eq!(main, "u1visita");
        assert_eq!(reminder, "u1visita-reminder24");
    }
}

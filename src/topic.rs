//! Deterministic keyword-driven topic labeling
//!
//! Classification walks a fixed, ordered table of `(label, keywords)` pairs
//! and returns the label of the first entry with any keyword occurring as a
//! case-insensitive substring of the query. Table order is the only tie-break
//! rule; an utterance mentioning both engine and brake terms labels as the
//! earlier entry. No scoring, no state.

/// Label returned when no table entry matches
pub const GENERAL_TOPIC: &str = "General";

/// Phrases signalling the user wants a fresh conversation
const TOPIC_CHANGE_CUES: &[&str] = &[
    "new topic",
    "new question",
    "different topic",
    "change topic",
    "start over",
    "new conversation",
    "reset",
    "clear history",
    "fresh start",
    "different question",
    "move on",
    "next topic",
];

/// An ordered topic table: label plus the keywords that select it
pub type TopicTable = Vec<(String, Vec<String>)>;

/// Classifies queries into topic labels
#[derive(Debug, Clone)]
pub struct TopicClassifier {
    table: TopicTable,
}

impl Default for TopicClassifier {
    fn default() -> Self {
        Self::new(default_table())
    }
}

impl TopicClassifier {
    /// Create a classifier over a custom ordered table
    ///
    /// Keywords are normalized to lowercase once here so `classify` only
    /// lowercases the query.
    #[must_use]
    pub fn new(table: TopicTable) -> Self {
        let table = table
            .into_iter()
            .map(|(label, keywords)| {
                let keywords = keywords.into_iter().map(|k| k.to_lowercase()).collect();
                (label, keywords)
            })
            .collect();
        Self { table }
    }

    /// Label a query by first-match table order
    ///
    /// Returns [`GENERAL_TOPIC`] if no keyword matches.
    #[must_use]
    pub fn classify(&self, text: &str) -> String {
        let lowered = text.to_lowercase();
        for (label, keywords) in &self.table {
            if keywords.iter().any(|k| lowered.contains(k.as_str())) {
                return label.clone();
            }
        }
        GENERAL_TOPIC.to_string()
    }

    /// True iff the query contains a topic-transition cue
    #[must_use]
    pub fn detect_topic_change(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        TOPIC_CHANGE_CUES.iter().any(|cue| lowered.contains(cue))
    }

    /// The ordered table driving classification
    #[must_use]
    pub fn table(&self) -> &TopicTable {
        &self.table
    }
}

/// The automotive topic table, in priority order
#[must_use]
pub fn default_table() -> TopicTable {
    let entries: &[(&str, &[&str])] = &[
        (
            "Engine",
            &["engine", "motor", "combustion", "cylinder", "piston", "valves", "timing"],
        ),
        (
            "Transmission",
            &["transmission", "gearbox", "clutch", "gear", "shift", "automatic", "manual"],
        ),
        (
            "Brakes",
            &["brake", "braking", "pad", "rotor", "disc", "caliper", "abs"],
        ),
        (
            "Suspension",
            &["suspension", "shock", "strut", "spring", "damper", "coil"],
        ),
        (
            "Electrical",
            &["electrical", "battery", "alternator", "starter", "wiring", "fuse", "relay"],
        ),
        (
            "Fuel System",
            &["fuel", "injection", "pump", "carburetor", "tank"],
        ),
        (
            "Cooling System",
            &["cooling", "radiator", "coolant", "thermostat", "temperature"],
        ),
        (
            "Exhaust",
            &["exhaust", "muffler", "catalytic", "converter", "emissions", "tailpipe"],
        ),
        (
            "Steering",
            &["steering", "rack", "pinion", "power steering", "alignment"],
        ),
        (
            "Tires",
            &["tire", "tyre", "wheel", "rim", "tread", "rotation"],
        ),
        ("Airbag", &["airbag", "srs", "crash", "sensor"]),
        (
            "Climate Control",
            &["air conditioning", "heating", "hvac", "climate", "heater", "ventilation"],
        ),
    ];

    entries
        .iter()
        .map(|(label, keywords)| {
            (
                (*label).to_string(),
                keywords.iter().map(|k| (*k).to_string()).collect(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_is_deterministic() {
        let classifier = TopicClassifier::default();
        let a = classifier.classify("How does the engine work?");
        let b = classifier.classify("How does the engine work?");
        assert_eq!(a, b);
    }

    #[test]
    fn classify_known_topics() {
        let classifier = TopicClassifier::default();
        assert_eq!(classifier.classify("How does the engine work?"), "Engine");
        assert_eq!(classifier.classify("brake pads are squeaking"), "Brakes");
        assert_eq!(classifier.classify("my radiator is leaking coolant"), "Cooling System");
    }

    #[test]
    fn classify_falls_back_to_general() {
        let classifier = TopicClassifier::default();
        assert_eq!(classifier.classify("what's the weather today"), GENERAL_TOPIC);
        assert_eq!(classifier.classify(""), GENERAL_TOPIC);
    }

    #[test]
    fn classify_table_order_wins_on_multi_topic() {
        let classifier = TopicClassifier::default();
        // Mentions both engine and brake terms; Engine comes first in the table.
        assert_eq!(
            classifier.classify("does engine braking wear the brake pads"),
            "Engine"
        );
    }

    #[test]
    fn classify_is_case_insensitive() {
        let classifier = TopicClassifier::default();
        assert_eq!(classifier.classify("ENGINE TROUBLE"), "Engine");
    }

    #[test]
    fn custom_table_order_respected() {
        let classifier = TopicClassifier::new(vec![
            ("First".to_string(), vec!["shared".to_string()]),
            ("Second".to_string(), vec!["shared".to_string()]),
        ]);
        assert_eq!(classifier.classify("a shared keyword"), "First");
    }

    #[test]
    fn topic_change_cues() {
        let classifier = TopicClassifier::default();
        assert!(classifier
            .detect_topic_change("Let's move on to a different topic, how do brakes work?"));
        assert!(classifier.detect_topic_change("START OVER please"));
        assert!(!classifier.detect_topic_change("how do brakes work"));
        assert!(!classifier.detect_topic_change(""));
    }
}

//! Dedup strategies and the factory that selects them.
//!
//! A strategy decides which part of a [`DedupKey`] identifies "the same
//! event", which window applies, and whether content changes matter. All
//! strategies are stateless; the state lives in the shared [`Deduper`].

use crate::application::deduper::Deduper;
use crate::domain::{
    bucket::BucketKey,
    entry::Observation,
    fingerprint::{Content, Fingerprint},
    key::{DedupKey, KeyField, UnknownKeyField},
};
use serde::Deserialize;
use std::time::Duration;

/// Longest window the event-stream strategy applies.
pub const EVENT_STREAM_MAX_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Default noisy-stream threshold for the event-stream strategy.
pub const DEFAULT_MAX_EVENTS_PER_WINDOW: usize = 100;

const FINGERPRINT_FIELDS: [KeyField; 5] = [
    KeyField::Source,
    KeyField::Namespace,
    KeyField::Kind,
    KeyField::Name,
    KeyField::Reason,
];

/// A dedup policy applied to incoming events.
pub trait DedupStrategy: Send + Sync {
    /// Configuration name of the strategy.
    fn name(&self) -> &'static str;

    /// Window the strategy applies given the deduper's default window.
    fn window(&self, default: Duration) -> Duration;

    /// Decide whether an event should create a new observation.
    ///
    /// Records the occurrence in `deduper` as a side effect. Returns `false`
    /// when the event is a duplicate that should be suppressed.
    fn should_create(&self, deduper: &Deduper, key: &DedupKey, content: &Content) -> bool;
}

fn decide(strategy: &'static str, bucket: BucketKey, observation: Observation) -> bool {
    match observation {
        Observation::Repeat { occurrences } => {
            tracing::debug!(strategy, bucket = %bucket, occurrences, "Duplicate event suppressed");
            false
        }
        other => {
            tracing::trace!(strategy, bucket = %bucket, observation = ?other, "Event allowed");
            true
        }
    }
}

/// Deduplicates on the resource identity and a fingerprint of the content.
///
/// The message hash is left out of the bucket, so a message that is reworded
/// without any semantic change is still a duplicate. A change in the
/// canonical content (for example a new severity) creates a new observation
/// and replaces the recorded fingerprint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FingerprintStrategy;

impl FingerprintStrategy {
    /// Create the strategy.
    pub fn new() -> Self {
        Self
    }

    /// Bucket a key falls into under this strategy.
    pub fn bucket(&self, key: &DedupKey) -> BucketKey {
        BucketKey::from_fields(self.name(), key, &FINGERPRINT_FIELDS)
    }
}

impl DedupStrategy for FingerprintStrategy {
    fn name(&self) -> &'static str {
        "fingerprint"
    }

    fn window(&self, default: Duration) -> Duration {
        default
    }

    fn should_create(&self, deduper: &Deduper, key: &DedupKey, content: &Content) -> bool {
        let bucket = self.bucket(key);
        let fingerprint = Fingerprint::of(content);
        let window = self.window(deduper.window());

        decide(
            self.name(),
            bucket,
            deduper.observe(bucket, window, Some(&fingerprint)),
        )
    }
}

/// Deduplicates high-frequency streams on the full key, ignoring content.
///
/// The window is capped at five minutes. When the number of occurrences in
/// one window reaches `max_events_per_window` a warning is logged once; the
/// occurrences stay suppressed either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventStreamStrategy {
    max_events_per_window: usize,
}

impl EventStreamStrategy {
    /// Create the strategy with a noisy-stream threshold.
    ///
    /// A threshold of zero is replaced by the default of 100.
    pub fn new(max_events_per_window: usize) -> Self {
        let max_events_per_window = if max_events_per_window == 0 {
            DEFAULT_MAX_EVENTS_PER_WINDOW
        } else {
            max_events_per_window
        };
        Self {
            max_events_per_window,
        }
    }

    /// Get the noisy-stream threshold.
    pub fn max_events_per_window(&self) -> usize {
        self.max_events_per_window
    }

    /// Bucket a key falls into under this strategy.
    pub fn bucket(&self, key: &DedupKey) -> BucketKey {
        BucketKey::from_fields(self.name(), key, &KeyField::ALL)
    }
}

impl Default for EventStreamStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EVENTS_PER_WINDOW)
    }
}

impl DedupStrategy for EventStreamStrategy {
    fn name(&self) -> &'static str {
        "event-stream"
    }

    fn window(&self, default: Duration) -> Duration {
        if default >= EVENT_STREAM_MAX_WINDOW {
            EVENT_STREAM_MAX_WINDOW
        } else {
            default
        }
    }

    fn should_create(&self, deduper: &Deduper, key: &DedupKey, _content: &Content) -> bool {
        let bucket = self.bucket(key);
        let window = self.window(deduper.window());
        let observation = deduper.observe(bucket, window, None);

        if let Observation::Repeat { occurrences } = observation {
            if occurrences == self.max_events_per_window as u64 {
                tracing::warn!(
                    bucket = %bucket,
                    source = %key.source,
                    namespace = %key.namespace,
                    kind = %key.kind,
                    name = %key.name,
                    reason = %key.reason,
                    occurrences,
                    window_secs = window.as_secs(),
                    "Noisy event stream reached max events per window"
                );
            }
        }

        decide(self.name(), bucket, observation)
    }
}

/// Deduplicates on a configured subset of key fields, ignoring content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBasedStrategy {
    fields: Vec<KeyField>,
    scope: String,
}

impl KeyBasedStrategy {
    /// Create the strategy over `fields`.
    ///
    /// Repeated fields are dropped, keeping the first occurrence.
    ///
    /// # Errors
    /// Returns `StrategyError::EmptyKeyFields` if `fields` is empty.
    pub fn new(fields: impl IntoIterator<Item = KeyField>) -> Result<Self, StrategyError> {
        let mut unique: Vec<KeyField> = Vec::new();
        for field in fields {
            if !unique.contains(&field) {
                unique.push(field);
            }
        }
        if unique.is_empty() {
            return Err(StrategyError::EmptyKeyFields);
        }

        // Strategies over different field sets never share buckets
        let names: Vec<&str> = unique.iter().map(|f| f.as_str()).collect();
        let scope = format!("key:{}", names.join(","));

        Ok(Self {
            fields: unique,
            scope,
        })
    }

    /// Create the strategy from field names such as `"source"` or `"messageHash"`.
    ///
    /// # Errors
    /// Returns `StrategyError` if the list is empty or a name is unknown.
    pub fn from_names<I, S>(names: I) -> Result<Self, StrategyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let fields = names
            .into_iter()
            .map(|name| name.as_ref().parse::<KeyField>())
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(fields)
    }

    /// Get the configured fields.
    pub fn fields(&self) -> &[KeyField] {
        &self.fields
    }

    /// Bucket a key falls into under this strategy.
    pub fn bucket(&self, key: &DedupKey) -> BucketKey {
        BucketKey::from_fields(&self.scope, key, &self.fields)
    }
}

impl DedupStrategy for KeyBasedStrategy {
    fn name(&self) -> &'static str {
        "key"
    }

    fn window(&self, default: Duration) -> Duration {
        default
    }

    fn should_create(&self, deduper: &Deduper, key: &DedupKey, _content: &Content) -> bool {
        let bucket = self.bucket(key);
        let window = self.window(deduper.window());

        decide(self.name(), bucket, deduper.observe(bucket, window, None))
    }
}

/// Convenience enum over the built-in strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Fingerprint strategy
    Fingerprint(FingerprintStrategy),
    /// Event-stream strategy
    EventStream(EventStreamStrategy),
    /// Key-based strategy
    KeyBased(KeyBasedStrategy),
}

impl Strategy {
    /// Create a fingerprint strategy.
    pub fn fingerprint() -> Self {
        Strategy::Fingerprint(FingerprintStrategy::new())
    }

    /// Create an event-stream strategy.
    pub fn event_stream(max_events_per_window: usize) -> Self {
        Strategy::EventStream(EventStreamStrategy::new(max_events_per_window))
    }

    /// Create a key-based strategy.
    ///
    /// # Errors
    /// Returns `StrategyError::EmptyKeyFields` if `fields` is empty.
    pub fn key_based(fields: impl IntoIterator<Item = KeyField>) -> Result<Self, StrategyError> {
        KeyBasedStrategy::new(fields).map(Strategy::KeyBased)
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::fingerprint()
    }
}

impl DedupStrategy for Strategy {
    fn name(&self) -> &'static str {
        match self {
            Strategy::Fingerprint(s) => s.name(),
            Strategy::EventStream(s) => s.name(),
            Strategy::KeyBased(s) => s.name(),
        }
    }

    fn window(&self, default: Duration) -> Duration {
        match self {
            Strategy::Fingerprint(s) => s.window(default),
            Strategy::EventStream(s) => s.window(default),
            Strategy::KeyBased(s) => s.window(default),
        }
    }

    fn should_create(&self, deduper: &Deduper, key: &DedupKey, content: &Content) -> bool {
        match self {
            Strategy::Fingerprint(s) => s.should_create(deduper, key, content),
            Strategy::EventStream(s) => s.should_create(deduper, key, content),
            Strategy::KeyBased(s) => s.should_create(deduper, key, content),
        }
    }
}

/// Error returned when a strategy cannot be built from its configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StrategyError {
    /// The key strategy needs at least one field
    #[error("key strategy requires at least one field")]
    EmptyKeyFields,
    /// A configured field name is not a dedup key field
    #[error("unknown key field: {0:?}")]
    UnknownKeyField(String),
}

impl From<UnknownKeyField> for StrategyError {
    fn from(err: UnknownKeyField) -> Self {
        StrategyError::UnknownKeyField(err.0)
    }
}

/// Strategy selection settings.
///
/// `max_events_per_window` of zero means unset and falls back to the default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StrategyConfig {
    /// Strategy name: `"fingerprint"`, `"event-stream"` or `"key"`
    pub strategy: String,
    /// Noisy-stream threshold for `"event-stream"`
    pub max_events_per_window: usize,
    /// Key fields for `"key"`
    pub fields: Vec<String>,
}

/// Build the strategy selected by `config`.
///
/// Empty or unrecognised names select the fingerprint strategy.
///
/// # Errors
/// Returns `StrategyError` if `"key"` is selected with no fields or with an
/// unknown field name.
///
/// # Example
/// ```
/// use dedup_engine::{get_strategy, DedupStrategy, StrategyConfig};
///
/// let config = StrategyConfig {
///     strategy: "key".to_string(),
///     fields: vec!["source".into(), "kind".into(), "name".into()],
///     ..Default::default()
/// };
/// assert_eq!(get_strategy(&config).unwrap().name(), "key");
/// assert_eq!(get_strategy(&StrategyConfig::default()).unwrap().name(), "fingerprint");
/// ```
pub fn get_strategy(config: &StrategyConfig) -> Result<Strategy, StrategyError> {
    match config.strategy.trim() {
        "" | "fingerprint" => Ok(Strategy::fingerprint()),
        "event-stream" => Ok(Strategy::event_stream(config.max_events_per_window)),
        "key" => KeyBasedStrategy::from_names(&config.fields).map(Strategy::KeyBased),
        unknown => {
            tracing::warn!(
                strategy = unknown,
                "Unknown dedup strategy, falling back to fingerprint"
            );
            Ok(Strategy::fingerprint())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mocks::MockClock;
    use serde_json::json;
    use std::sync::Arc;

    fn deduper(clock: &MockClock, window: Duration) -> Deduper {
        Deduper::builder()
            .with_window(window)
            .with_clock(Arc::new(clock.clone()))
            .build()
            .unwrap()
    }

    fn key(message_hash: &str) -> DedupKey {
        DedupKey::new("falco", "prod", "Pod", "web-0", "ShellSpawned", message_hash)
    }

    fn content(value: serde_json::Value) -> Content {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_event_stream_window() {
        let s = EventStreamStrategy::default();
        assert_eq!(
            s.window(Duration::from_secs(600)),
            Duration::from_secs(300)
        );
        assert_eq!(s.window(Duration::from_secs(300)), Duration::from_secs(300));
        assert_eq!(s.window(Duration::from_secs(30)), Duration::from_secs(30));
    }

    #[test]
    fn test_identity_windows() {
        let key_based = KeyBasedStrategy::new([KeyField::Source]).unwrap();
        for secs in [1, 30, 600, 86_400] {
            let d = Duration::from_secs(secs);
            assert_eq!(FingerprintStrategy::new().window(d), d);
            assert_eq!(key_based.window(d), d);
        }
    }

    #[tokio::test]
    async fn test_fingerprint_suppresses_same_content() {
        let clock = MockClock::starting_now();
        let deduper = deduper(&clock, Duration::from_secs(60));
        let s = FingerprintStrategy::new();
        let c = content(json!({"source": "falco", "severity": "HIGH", "timestamp": "t1"}));
        let c2 = content(json!({"source": "falco", "severity": "HIGH", "timestamp": "t2"}));

        assert!(s.should_create(&deduper, &key("m1"), &c));
        // Message hash and volatile fields do not matter
        assert!(!s.should_create(&deduper, &key("m2"), &c2));
        assert!(!s.should_create(&deduper, &key("m1"), &c));
    }

    #[tokio::test]
    async fn test_fingerprint_allows_changed_content() {
        let clock = MockClock::starting_now();
        let deduper = deduper(&clock, Duration::from_secs(60));
        let s = FingerprintStrategy::new();
        let high = content(json!({"severity": "HIGH"}));
        let critical = content(json!({"severity": "CRITICAL"}));

        assert!(s.should_create(&deduper, &key("m"), &high));
        assert!(s.should_create(&deduper, &key("m"), &critical));
        assert!(!s.should_create(&deduper, &key("m"), &critical));
        // Going back is a change too
        assert!(s.should_create(&deduper, &key("m"), &high));
    }

    #[tokio::test]
    async fn test_fingerprint_window_expiry() {
        let clock = MockClock::starting_now();
        let deduper = deduper(&clock, Duration::from_secs(60));
        let s = FingerprintStrategy::new();
        let c = content(json!({"severity": "HIGH"}));

        assert!(s.should_create(&deduper, &key("m"), &c));
        clock.advance(Duration::from_secs(59));
        assert!(!s.should_create(&deduper, &key("m"), &c));
        clock.advance(Duration::from_secs(1));
        assert!(s.should_create(&deduper, &key("m"), &c));
    }

    #[tokio::test]
    async fn test_event_stream_ignores_content() {
        let clock = MockClock::starting_now();
        let deduper = deduper(&clock, Duration::from_secs(60));
        let s = EventStreamStrategy::default();

        assert!(s.should_create(&deduper, &key("m"), &content(json!({"a": 1}))));
        assert!(!s.should_create(&deduper, &key("m"), &content(json!({"a": 2}))));
        // Message hash is part of the bucket
        assert!(s.should_create(&deduper, &key("other"), &content(json!({"a": 1}))));
    }

    #[tokio::test]
    async fn test_event_stream_caps_window() {
        let clock = MockClock::starting_now();
        let deduper = deduper(&clock, Duration::from_secs(3600));
        let s = EventStreamStrategy::default();
        let c = Content::new();

        assert!(s.should_create(&deduper, &key("m"), &c));
        clock.advance(Duration::from_secs(299));
        assert!(!s.should_create(&deduper, &key("m"), &c));
        clock.advance(Duration::from_secs(1));
        assert!(s.should_create(&deduper, &key("m"), &c));
    }

    #[tokio::test]
    async fn test_event_stream_keeps_suppressing_past_threshold() {
        let clock = MockClock::starting_now();
        let deduper = deduper(&clock, Duration::from_secs(60));
        let s = EventStreamStrategy::new(3);
        let c = Content::new();

        assert!(s.should_create(&deduper, &key("m"), &c));
        for _ in 0..10 {
            assert!(!s.should_create(&deduper, &key("m"), &c));
        }
        let entry = deduper.entry(&s.bucket(&key("m"))).unwrap();
        assert_eq!(entry.occurrences, 11);
    }

    /// Counts WARN events seen by the subscriber.
    struct WarnCounter(Arc<std::sync::atomic::AtomicUsize>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for WarnCounter {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            if *event.metadata().level() == tracing::Level::WARN {
                self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }
        }
    }

    #[tokio::test]
    async fn test_event_stream_warns_once_per_window() {
        use tracing_subscriber::layer::SubscriberExt;

        let clock = MockClock::starting_now();
        let deduper = deduper(&clock, Duration::from_secs(60));
        let s = EventStreamStrategy::new(3);
        let c = Content::new();
        let warnings = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(WarnCounter(warnings.clone()));
        let count = || warnings.load(std::sync::atomic::Ordering::SeqCst);

        tracing::subscriber::with_default(subscriber, || {
            // occurrences 1 and 2 stay quiet
            s.should_create(&deduper, &key("m"), &c);
            s.should_create(&deduper, &key("m"), &c);
            assert_eq!(count(), 0);

            for _ in 0..10 {
                s.should_create(&deduper, &key("m"), &c);
            }
            assert_eq!(count(), 1);

            clock.advance(Duration::from_secs(60));
            for _ in 0..12 {
                s.should_create(&deduper, &key("m"), &c);
            }
            assert_eq!(count(), 2);
        });
    }

    #[test]
    fn test_event_stream_zero_threshold_uses_default() {
        assert_eq!(
            EventStreamStrategy::new(0).max_events_per_window(),
            DEFAULT_MAX_EVENTS_PER_WINDOW
        );
        assert_eq!(EventStreamStrategy::new(7).max_events_per_window(), 7);
    }

    #[tokio::test]
    async fn test_key_based_ignores_other_fields() {
        let clock = MockClock::starting_now();
        let deduper = deduper(&clock, Duration::from_secs(60));
        let s = KeyBasedStrategy::new([KeyField::Source, KeyField::Kind, KeyField::Name]).unwrap();

        assert!(s.should_create(&deduper, &key("m1"), &content(json!({"a": 1}))));
        assert!(!s.should_create(&deduper, &key("m2"), &content(json!({"a": 2}))));

        let mut other = key("m1");
        other.name = "web-1".to_string();
        assert!(s.should_create(&deduper, &other, &Content::new()));
    }

    #[test]
    fn test_key_based_fields() {
        assert_eq!(
            KeyBasedStrategy::new(Vec::new()).unwrap_err(),
            StrategyError::EmptyKeyFields
        );

        let s = KeyBasedStrategy::new([KeyField::Kind, KeyField::Source, KeyField::Kind]).unwrap();
        assert_eq!(s.fields(), &[KeyField::Kind, KeyField::Source]);

        let err = KeyBasedStrategy::from_names(["source", "colour"]).unwrap_err();
        assert_eq!(err, StrategyError::UnknownKeyField("colour".to_string()));
    }

    #[test]
    fn test_key_based_scopes_differ_by_fields() {
        let a = KeyBasedStrategy::new([KeyField::Source]).unwrap();
        let b = KeyBasedStrategy::new([KeyField::Kind]).unwrap();
        let k = DedupKey::new("x", "", "x", "", "", "");

        assert_ne!(a.bucket(&k), b.bucket(&k));
    }

    #[tokio::test]
    async fn test_strategies_share_deduper_without_collisions() {
        let clock = MockClock::starting_now();
        let deduper = deduper(&clock, Duration::from_secs(60));
        let c = content(json!({"severity": "LOW"}));

        assert!(Strategy::fingerprint().should_create(&deduper, &key("m"), &c));
        assert!(Strategy::event_stream(10).should_create(&deduper, &key("m"), &c));
        assert_eq!(deduper.len(), 2);
    }

    #[test]
    fn test_get_strategy_names() {
        let cases = [
            ("", "fingerprint"),
            ("fingerprint", "fingerprint"),
            ("event-stream", "event-stream"),
            ("bogus", "fingerprint"),
        ];
        for (name, expected) in cases {
            let config = StrategyConfig {
                strategy: name.to_string(),
                ..Default::default()
            };
            assert_eq!(get_strategy(&config).unwrap().name(), expected, "{name}");
        }

        let config = StrategyConfig {
            strategy: "key".to_string(),
            fields: vec!["source".to_string(), "messageHash".to_string()],
            ..Default::default()
        };
        assert_eq!(get_strategy(&config).unwrap().name(), "key");
    }

    #[test]
    fn test_get_strategy_errors() {
        let empty = StrategyConfig {
            strategy: "key".to_string(),
            ..Default::default()
        };
        assert_eq!(get_strategy(&empty).unwrap_err(), StrategyError::EmptyKeyFields);

        let unknown = StrategyConfig {
            strategy: "key".to_string(),
            fields: vec!["bogus".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            get_strategy(&unknown),
            Err(StrategyError::UnknownKeyField(_))
        ));
    }

    #[test]
    fn test_get_strategy_event_stream_threshold() {
        let config = StrategyConfig {
            strategy: "event-stream".to_string(),
            max_events_per_window: 0,
            ..Default::default()
        };
        assert_eq!(
            get_strategy(&config).unwrap(),
            Strategy::EventStream(EventStreamStrategy::new(DEFAULT_MAX_EVENTS_PER_WINDOW))
        );
    }

    #[test]
    fn test_strategy_config_deserialize() {
        let config: StrategyConfig = serde_json::from_value(json!({
            "strategy": "event-stream",
            "maxEventsPerWindow": 25
        }))
        .unwrap();

        assert_eq!(config.max_events_per_window, 25);
        assert!(config.fields.is_empty());
    }
}

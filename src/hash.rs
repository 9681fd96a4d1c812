//! Deterministic, order-independent structural digest used to fingerprint
//! an entity's model definition and, in turn, the whole entity set.

use sha2::{Digest, Sha256};

/// A tagged description of a value's shape, fed to [`digest`] to compute its
/// identity hash. Adapters produce these for their entity model descriptors,
/// typically from their own model-inspection facility.
#[derive(Clone, Debug, PartialEq)]
pub enum HashValue {
    /// Contributes nothing: a zero/default/absent value (numeric 0, empty
    /// string, empty container, null reference).
    Unit,
    /// A leaf value; fed in its textual form.
    Scalar(String),
    /// An unordered sequence: elements are hashed individually, sorted, and
    /// the sorted digests are fed back in as a nested list.
    Sequence(Vec<HashValue>),
    /// An unordered key -> value association: sorted by the hash of the key.
    Mapping(Vec<(HashValue, HashValue)>),
    /// A record/struct: fields are visited in declared order. `ignored`
    /// fields (private-by-convention or tagged to be skipped) and zero
    /// fields are dropped by the caller before reaching here, but the flag
    /// is kept so a [`HashValue`] can be constructed once and filtered
    /// generically instead of requiring callers to pre-prune by hand.
    Record(Vec<(String, bool, HashValue)>),
}

impl HashValue {
    /// Convenience constructor for a leaf value already rendered as text.
    /// Only an empty string is a zero-value here: `scalar` has no idea
    /// whether its caller's original value was a number, a bool, or a
    /// string, so it cannot tell a real zero/false from a string that
    /// merely reads `"0"` or `"false"`. Callers describing a typed value
    /// must make that call themselves and emit [`HashValue::Unit`]
    /// directly for a genuine numeric zero or boolean false.
    pub fn scalar(text: impl Into<String>) -> HashValue {
        let text = text.into();
        if text.is_empty() {
            HashValue::Unit
        } else {
            HashValue::Scalar(text)
        }
    }

    fn is_unit(&self) -> bool {
        match self {
            HashValue::Unit => true,
            HashValue::Sequence(items) => items.is_empty(),
            HashValue::Mapping(items) => items.is_empty(),
            HashValue::Record(fields) => fields.is_empty(),
            HashValue::Scalar(_) => false,
        }
    }
}

/// Implemented by whatever represents an entity's model definition on the
/// adapter side: describes the value's shape as a [`HashValue`] tree for
/// the identity hasher to digest.
pub trait Describe {
    fn describe(&self) -> HashValue;
}

/// An adapter that has already built its own [`HashValue`] tree (e.g. by
/// walking a reflection-based model description) can hand it to the core
/// as-is.
impl Describe for HashValue {
    fn describe(&self) -> HashValue {
        self.clone()
    }
}

/// Computes the lowercase-hex SHA-256 identity digest of a [`HashValue`]
/// tree, applying the zero-value rule, record field filtering (private +
/// `ignore`-tagged + zero fields dropped), and sorted-map / unordered-list
/// semantics.
pub fn digest(value: &HashValue) -> String {
    let mut hasher = Sha256::new();
    absorb(value, &mut hasher);
    hex::encode(hasher.finalize())
}

fn absorb(value: &HashValue, hasher: &mut Sha256) {
    if value.is_unit() {
        return;
    }

    match value {
        HashValue::Unit => {}
        HashValue::Scalar(text) => hasher.update(text.as_bytes()),
        HashValue::Mapping(entries) => absorb_mapping(entries, hasher),
        HashValue::Record(fields) => absorb_record(fields, hasher),
        HashValue::Sequence(items) => absorb_sequence(items, hasher),
    }
}

fn absorb_mapping(entries: &[(HashValue, HashValue)], hasher: &mut Sha256) {
    let mut key_hashes: Vec<(String, &HashValue)> = entries
        .iter()
        .map(|(k, v)| (digest(k), v))
        .collect();
    key_hashes.sort_by(|a, b| a.0.cmp(&b.0));

    for (kh, v) in key_hashes {
        hasher.update(kh.as_bytes());
        hasher.update(digest(v).as_bytes());
    }
}

fn absorb_record(fields: &[(String, bool, HashValue)], hasher: &mut Sha256) {
    for (name, ignored, value) in fields {
        if *ignored || starts_lowercase(name) || value.is_unit() {
            continue;
        }
        absorb(value, hasher);
    }
}

fn absorb_sequence(items: &[HashValue], hasher: &mut Sha256) {
    let mut hashes: Vec<String> = items.iter().map(digest).collect();
    hashes.sort();
    for h in hashes {
        hasher.update(h.as_bytes());
    }
}

fn starts_lowercase(name: &str) -> bool {
    name.chars()
        .next()
        .map(|c| c.is_lowercase())
        .unwrap_or(false)
}

/// Computes the identity hash of an ordered-by-name entity set: each
/// per-entity digest is computed individually, then the sorted list of
/// those digests is fed back into the hasher as a [`HashValue::Sequence`]
/// to obtain the final schema identity. `hash_fn` lets the caller plug in
/// an [`Hasher`] implementation other than the default.
pub fn identity_of_entities<'a>(
    models: impl Iterator<Item = (&'a str, HashValue)>,
    hash_fn: &dyn Fn(&HashValue) -> String,
) -> String {
    let mut models: Vec<(&'a str, HashValue)> = models.collect();
    models.sort_by(|a, b| a.0.cmp(b.0));

    let per_entity: Vec<HashValue> = models
        .into_iter()
        .map(|(_, model)| HashValue::scalar(hash_fn(&model)))
        .collect();

    hash_fn(&HashValue::Sequence(per_entity))
}

/// A pluggable identity-hash algorithm. The core is generic over this so an
/// application can swap in a different digest while keeping the structural
/// traversal (ordering, zero-value rule, field filtering) fixed.
pub trait Hasher {
    fn hash(&self, value: &HashValue) -> String;
}

/// The default hasher: recursive structural digest, SHA-256, lowercase hex.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256Hasher;

impl Hasher for Sha256Hasher {
    fn hash(&self, value: &HashValue) -> String {
        digest(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: Vec<(&str, bool, HashValue)>) -> HashValue {
        HashValue::Record(
            fields
                .into_iter()
                .map(|(n, ignored, v)| (n.to_string(), ignored, v))
                .collect(),
        )
    }

    #[test]
    fn zero_values_contribute_nothing() {
        let empty_string = HashValue::scalar("");
        let empty_seq = HashValue::Sequence(vec![]);
        assert_eq!(digest(&empty_string), digest(&HashValue::Unit));
        assert_eq!(digest(&empty_seq), digest(&HashValue::Unit));
    }

    #[test]
    fn scalar_text_reading_zero_or_false_is_not_elided() {
        // "0" and "false" are legitimate string content (a status code, a
        // default-value string column, ...), not a numeric zero or a bool.
        // Only the Describe implementor that knows the original type may
        // decide that, by emitting HashValue::Unit itself.
        let zero_text = HashValue::scalar("0");
        let false_text = HashValue::scalar("false");
        assert_ne!(digest(&zero_text), digest(&HashValue::Unit));
        assert_ne!(digest(&false_text), digest(&HashValue::Unit));
        assert_ne!(digest(&zero_text), digest(&false_text));
    }

    #[test]
    fn mapping_is_order_independent() {
        let a = HashValue::Mapping(vec![
            (HashValue::scalar("k1"), HashValue::scalar("v1")),
            (HashValue::scalar("k2"), HashValue::scalar("v2")),
        ]);
        let b = HashValue::Mapping(vec![
            (HashValue::scalar("k2"), HashValue::scalar("v2")),
            (HashValue::scalar("k1"), HashValue::scalar("v1")),
        ]);
        assert_eq!(digest(&a), digest(&b));
    }

    #[test]
    fn sequence_is_unordered() {
        let a = HashValue::Sequence(vec![HashValue::scalar("x"), HashValue::scalar("y")]);
        let b = HashValue::Sequence(vec![HashValue::scalar("y"), HashValue::scalar("x")]);
        assert_eq!(digest(&a), digest(&b));
    }

    #[test]
    fn private_and_ignored_fields_are_skipped() {
        let visible = record(vec![("Name", false, HashValue::scalar("user"))]);
        let with_private = record(vec![
            ("Name", false, HashValue::scalar("user")),
            ("internal", false, HashValue::scalar("noise")),
        ]);
        let with_ignored = record(vec![
            ("Name", false, HashValue::scalar("user")),
            ("Secret", true, HashValue::scalar("noise")),
        ]);
        assert_eq!(digest(&visible), digest(&with_private));
        assert_eq!(digest(&visible), digest(&with_ignored));
    }

    #[test]
    fn discriminates_distinct_schemas() {
        let user_v1 = record(vec![("Name", false, HashValue::scalar("string"))]);
        let user_v2 = record(vec![
            ("Name", false, HashValue::scalar("string")),
            ("Age", false, HashValue::scalar("int")),
        ]);
        let profile_v1 = record(vec![("Bio", false, HashValue::scalar("string"))]);
        let profile_v2 = record(vec![
            ("Bio", false, HashValue::scalar("string")),
            ("Avatar", false, HashValue::scalar("string")),
        ]);

        let schema = |entities: Vec<(&str, HashValue)>| {
            identity_of_entities(entities.into_iter().map(|(n, v)| (n, v)), &digest)
        };

        let s1 = schema(vec![("user", user_v1.clone())]);
        let s2 = schema(vec![("user", user_v1.clone()), ("profile", profile_v1.clone())]);
        let s3 = schema(vec![("user", user_v2.clone()), ("profile", profile_v1.clone())]);
        let s4 = schema(vec![("user", user_v2), ("profile", profile_v2)]);

        let all = [s1, s2, s3, s4];
        for i in 0..all.len() {
            for j in (i + 1)..all.len() {
                assert_ne!(all[i], all[j], "schemas {i} and {j} must differ");
            }
        }
    }

    #[test]
    fn entity_order_does_not_affect_identity() {
        let user = record(vec![("Name", false, HashValue::scalar("string"))]);
        let profile = record(vec![("Bio", false, HashValue::scalar("string"))]);

        let forward = identity_of_entities(
            vec![("user", user.clone()), ("profile", profile.clone())].into_iter(),
            &digest,
        );
        let backward = identity_of_entities(
            vec![("profile", profile), ("user", user)].into_iter(),
            &digest,
        );

        assert_eq!(forward, backward);
    }

    #[test]
    fn digest_is_64_char_lowercase_hex() {
        let d = digest(&HashValue::scalar("anything"));
        assert_eq!(d.len(), 64);
        assert!(d.chars().all(|c| c.is_ascii_hexdigit() && !c.is_uppercase()));
    }
}

//! The stored event record and the workload identity it carries.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{EventType, Location, VERSION};

/// Workload identity attached to an event at insertion time.
///
/// Constructed through the kind-specific helpers so that the `ref`
/// invariant holds by construction: only tasks reference a service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    kind: EventType,
    id: String,
    name: String,
    reference: String,
}

impl Identity {
    /// No workload identity; stored as [`EventType::Etc`].
    pub fn none() -> Self {
        Self::default()
    }

    pub fn service(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::of(EventType::Service, id, name)
    }

    /// A task, optionally referencing the service that owns it.
    pub fn task(
        id: impl Into<String>,
        name: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            kind: EventType::Task,
            id: id.into(),
            name: name.into(),
            reference: service.into(),
        }
    }

    /// Any kind without a reference. A task built this way has an empty `ref`.
    pub fn of(kind: EventType, id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            name: name.into(),
            reference: String::new(),
        }
    }

    pub fn kind(&self) -> EventType {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }
}

/// One stored document.
///
/// `M` is the payload type. Reads decode into the default
/// [`serde_json::Value`]; writes may use any serializable payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event<M = Value> {
    pub version: String,
    #[serde(default)]
    pub cluster: String,
    #[serde(default)]
    pub rack: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub component: String,
    #[serde(rename = "type", default)]
    pub kind: EventType,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "ref", default)]
    pub reference: String,
    pub msg: M,
    pub created: DateTime<Utc>,
}

impl<M> Event<M> {
    /// Builds an event from a session's location context and an identity.
    ///
    /// The version is always [`VERSION`]; `ref` is dropped unless the
    /// identity is a task.
    pub fn stamp(location: &Location, identity: Identity, msg: M, created: DateTime<Utc>) -> Self {
        let reference = if identity.kind == EventType::Task {
            identity.reference
        } else {
            String::new()
        };

        Self {
            version: VERSION.to_string(),
            cluster: location.cluster.clone(),
            rack: location.rack.clone(),
            host: location.host.clone(),
            component: location.component.clone(),
            kind: identity.kind,
            id: identity.id,
            name: identity.name,
            reference,
            msg,
            created,
        }
    }

    /// Returns the location the event was recorded under.
    pub fn location(&self) -> Location {
        Location::new(
            self.cluster.clone(),
            self.rack.clone(),
            self.host.clone(),
            self.component.clone(),
        )
    }
}

impl Event<Value> {
    /// Decodes the opaque payload into a concrete type.
    pub fn decode_msg<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn laptop() -> Location {
        Location::new("red", "r01", "laptop", "linux")
    }

    #[test]
    fn stamp_copies_context_and_version() {
        let now = Utc::now();
        let ev = Event::stamp(&laptop(), Identity::service("", "blog"), json!({"Nick": "x"}), now);

        assert_eq!(ev.version, VERSION);
        assert_eq!(ev.location(), laptop());
        assert_eq!(ev.kind, EventType::Service);
        assert_eq!(ev.name, "blog");
        assert_eq!(ev.created, now);
    }

    #[test]
    fn only_tasks_keep_a_reference() {
        let now = Utc::now();
        let task = Event::stamp(&laptop(), Identity::task("7", "cafe.1", "cafe"), (), now);
        assert_eq!(task.reference, "cafe");

        let none = Event::stamp(&laptop(), Identity::none(), (), now);
        assert_eq!(none.kind, EventType::Etc);
        assert!(none.reference.is_empty());
    }

    #[test]
    fn serialized_keys_are_canonical() {
        let ev = Event::stamp(
            &laptop(),
            Identity::task("", "cafe.1", "cafe"),
            json!("payload"),
            Utc::now(),
        );
        let doc = serde_json::to_value(&ev).expect("serialize");
        let obj = doc.as_object().expect("object");

        for field in crate::Field::ALL {
            assert!(obj.contains_key(field.as_str()), "missing key {field}");
        }
        assert_eq!(doc["type"], "Task");
        assert_eq!(doc["ref"], "cafe");
    }

    #[test]
    fn decode_msg_reads_payload() {
        #[derive(Deserialize)]
        struct Sample {
            #[serde(rename = "Nick")]
            nick: String,
        }

        let ev = Event::stamp(&laptop(), Identity::none(), json!({"Nick": "Fat Baby"}), Utc::now());
        let sample: Sample = ev.decode_msg().expect("decode");
        assert_eq!(sample.nick, "Fat Baby");
    }

    #[test]
    fn missing_identity_fields_default_when_decoding() {
        let doc = json!({
            "version": "0.7",
            "cluster": "red",
            "msg": null,
            "created": "2024-01-01T00:00:00Z"
        });
        let ev: Event = serde_json::from_value(doc).expect("decode");
        assert_eq!(ev.kind, EventType::Etc);
        assert!(ev.rack.is_empty());
        assert!(ev.reference.is_empty());
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use accessdesk_core::{Aggregate, AggregateRoot, DomainError, SoftwareId, UserId};
use accessdesk_events::Event;

use crate::AccessLevels;

/// Stream type for software entries.
pub const SOFTWARE_AGGREGATE_TYPE: &str = "catalog.software";

/// Aggregate root: Software.
///
/// Once created it never changes; the only command is creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Software {
    id: SoftwareId,
    name: String,
    description: String,
    access_levels: Option<AccessLevels>,
    created_by: Option<UserId>,
    created_at: Option<DateTime<Utc>>,
    version: u64,
}

impl Software {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: SoftwareId) -> Self {
        Self {
            id,
            name: String::new(),
            description: String::new(),
            access_levels: None,
            created_by: None,
            created_at: None,
            version: 0,
        }
    }

    pub fn is_created(&self) -> bool {
        self.access_levels.is_some()
    }

    pub fn id_typed(&self) -> SoftwareId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn access_levels(&self) -> Option<&AccessLevels> {
        self.access_levels.as_ref()
    }

    pub fn created_by(&self) -> Option<UserId> {
        self.created_by
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    /// Whether `label` is one of the offered access levels (exact match).
    pub fn offers(&self, label: &str) -> bool {
        self.access_levels
            .as_ref()
            .is_some_and(|levels| levels.contains(label))
    }
}

impl AggregateRoot for Software {
    type Id = SoftwareId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateSoftware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSoftware {
    pub software_id: SoftwareId,
    pub name: String,
    pub description: String,
    pub access_levels: Vec<String>,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoftwareCommand {
    Create(CreateSoftware),
}

/// Event: SoftwareCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftwareCreated {
    pub software_id: SoftwareId,
    pub name: String,
    pub description: String,
    pub access_levels: AccessLevels,
    pub created_by: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoftwareEvent {
    Created(SoftwareCreated),
}

impl Event for SoftwareEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SoftwareEvent::Created(_) => "catalog.software.created",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SoftwareEvent::Created(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Software {
    type Command = SoftwareCommand;
    type Event = SoftwareEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SoftwareEvent::Created(e) => {
                self.id = e.software_id;
                self.name = e.name.clone();
                self.description = e.description.clone();
                self.access_levels = Some(e.access_levels.clone());
                self.created_by = Some(e.created_by);
                self.created_at = Some(e.occurred_at);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            SoftwareCommand::Create(cmd) => self.handle_create(cmd),
        }
    }
}

impl Software {
    fn handle_create(&self, cmd: &CreateSoftware) -> Result<Vec<SoftwareEvent>, DomainError> {
        if self.is_created() {
            return Err(DomainError::conflict("software already exists"));
        }
        if self.id != cmd.software_id {
            return Err(DomainError::validation("software_id mismatch"));
        }

        let name = cmd.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }

        let description = cmd.description.trim();
        if description.is_empty() {
            return Err(DomainError::validation("description cannot be empty"));
        }

        let access_levels = AccessLevels::new(cmd.access_levels.iter().cloned())?;

        Ok(vec![SoftwareEvent::Created(SoftwareCreated {
            software_id: cmd.software_id,
            name: name.to_string(),
            description: description.to_string(),
            access_levels,
            created_by: cmd.created_by,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accessdesk_events::execute;

    fn create_cmd(id: SoftwareId, levels: &[&str]) -> SoftwareCommand {
        SoftwareCommand::Create(CreateSoftware {
            software_id: id,
            name: "CRM".to_string(),
            description: "Customer relationship management".to_string(),
            access_levels: levels.iter().map(|l| l.to_string()).collect(),
            created_by: UserId::new(),
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn create_software_emits_created_event() {
        let id = SoftwareId::new();
        let software = Software::empty(id);

        let events = software.handle(&create_cmd(id, &["Read", "Write"])).unwrap();
        assert_eq!(events.len(), 1);

        let SoftwareEvent::Created(e) = &events[0];
        assert_eq!(e.software_id, id);
        assert_eq!(e.name, "CRM");
        assert_eq!(e.access_levels.labels(), vec!["Read", "Write"]);
        assert_eq!(events[0].event_type(), "catalog.software.created");
    }

    #[test]
    fn created_software_offers_its_levels_exactly() {
        let id = SoftwareId::new();
        let mut software = Software::empty(id);
        execute(&mut software, &create_cmd(id, &["Read", "Write"])).unwrap();

        assert!(software.is_created());
        assert_eq!(software.version(), 1);
        assert!(software.offers("Write"));
        assert!(!software.offers("write"));
        assert!(!software.offers("Admin"));
    }

    #[test]
    fn rejects_blank_name() {
        let id = SoftwareId::new();
        let SoftwareCommand::Create(mut cmd) = create_cmd(id, &["Read"]);
        cmd.name = "   ".to_string();

        let err = Software::empty(id).handle(&SoftwareCommand::Create(cmd)).unwrap_err();
        assert_eq!(err, DomainError::validation("name cannot be empty"));
    }

    #[test]
    fn rejects_blank_description() {
        let id = SoftwareId::new();
        let SoftwareCommand::Create(mut cmd) = create_cmd(id, &["Read"]);
        cmd.description = String::new();

        let err = Software::empty(id).handle(&SoftwareCommand::Create(cmd)).unwrap_err();
        assert_eq!(err, DomainError::validation("description cannot be empty"));
    }

    #[test]
    fn rejects_empty_and_duplicate_levels() {
        let id = SoftwareId::new();
        let empty = Software::empty(id).handle(&create_cmd(id, &[])).unwrap_err();
        assert!(matches!(empty, DomainError::Validation(_)));

        let dup = Software::empty(id)
            .handle(&create_cmd(id, &["Read", "Read"]))
            .unwrap_err();
        assert!(matches!(dup, DomainError::Validation(_)));
    }

    #[test]
    fn software_is_immutable_once_created() {
        let id = SoftwareId::new();
        let mut software = Software::empty(id);
        execute(&mut software, &create_cmd(id, &["Read"])).unwrap();

        let err = software.handle(&create_cmd(id, &["Write"])).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert!(software.offers("Read"));
        assert!(!software.offers("Write"));
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let id = SoftwareId::new();
        let software = Software::empty(id);
        let before = software.clone();
        let _ = software.handle(&create_cmd(id, &["Read"]));
        assert_eq!(software, before);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Any label list with a repeated entry is rejected.
            #[test]
            fn duplicated_level_is_always_rejected(
                mut labels in proptest::collection::vec("[A-Za-z]{1,8}", 1..6),
                pick in any::<prop::sample::Index>(),
            ) {
                let dup = labels[pick.index(labels.len())].clone();
                labels.push(dup);
                let id = SoftwareId::new();
                let refs: Vec<&str> = labels.iter().map(String::as_str).collect();
                let result = Software::empty(id).handle(&create_cmd(id, &refs));
                prop_assert!(matches!(result, Err(DomainError::Validation(_))));
            }

            /// Distinct labels always produce an entry offering exactly those labels.
            #[test]
            fn distinct_levels_are_all_offered(
                labels in proptest::collection::hash_set("[A-Za-z]{1,8}", 1..6),
            ) {
                let id = SoftwareId::new();
                let refs: Vec<&str> = labels.iter().map(String::as_str).collect();
                let mut software = Software::empty(id);
                execute(&mut software, &create_cmd(id, &refs)).unwrap();
                for label in &labels {
                    prop_assert!(software.offers(label));
                }
                prop_assert_eq!(software.access_levels().map(|l| l.len()), Some(labels.len()));
            }
        }
    }
}

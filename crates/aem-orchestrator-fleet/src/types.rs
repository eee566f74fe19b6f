//! Fleet roles, stack coordinates and resolved identifiers.

use std::fmt;

/// The three fleets the orchestrator manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FleetRole {
    /// Publish instances, each served by one replication agent.
    Publish,
    /// Dispatchers fronting the publish fleet.
    PublishDispatcher,
    /// Dispatchers fronting the author instance.
    AuthorDispatcher,
}

impl FleetRole {
    /// All roles, in resolution order.
    pub const ALL: [Self; 3] = [Self::Publish, Self::PublishDispatcher, Self::AuthorDispatcher];

    /// Return the role name used in logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Publish => "publish",
            Self::PublishDispatcher => "publish-dispatcher",
            Self::AuthorDispatcher => "author-dispatcher",
        }
    }
}

impl fmt::Display for FleetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a fleet is declared: a stack and the logical id of its auto
/// scaling group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetStack {
    /// CloudFormation stack name.
    pub stack_name: String,
    /// Logical resource id of the auto scaling group.
    pub logical_id: String,
}

impl FleetStack {
    /// Create stack coordinates.
    #[must_use]
    pub fn new(stack_name: impl Into<String>, logical_id: impl Into<String>) -> Self {
        Self {
            stack_name: stack_name.into(),
            logical_id: logical_id.into(),
        }
    }
}

/// Stack coordinates for every managed fleet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetStacks {
    /// Publish fleet.
    pub publish: FleetStack,
    /// Publish dispatcher fleet.
    pub publish_dispatcher: FleetStack,
    /// Author dispatcher fleet.
    pub author_dispatcher: FleetStack,
}

impl FleetStacks {
    /// Stack coordinates for `role`.
    #[must_use]
    pub const fn get(&self, role: FleetRole) -> &FleetStack {
        match role {
            FleetRole::Publish => &self.publish,
            FleetRole::PublishDispatcher => &self.publish_dispatcher,
            FleetRole::AuthorDispatcher => &self.author_dispatcher,
        }
    }
}

/// Physical fleet identifiers, resolved once at startup.
///
/// There are no setters: once built, the identifiers stay fixed for the
/// lifetime of the process and can be shared by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetIdentifiers {
    publish: String,
    publish_dispatcher: String,
    author_dispatcher: String,
}

impl FleetIdentifiers {
    /// Build the identifiers from already resolved physical ids.
    #[must_use]
    pub fn new(
        publish: impl Into<String>,
        publish_dispatcher: impl Into<String>,
        author_dispatcher: impl Into<String>,
    ) -> Self {
        Self {
            publish: publish.into(),
            publish_dispatcher: publish_dispatcher.into(),
            author_dispatcher: author_dispatcher.into(),
        }
    }

    /// Physical id of the publish fleet.
    #[must_use]
    pub fn publish(&self) -> &str {
        &self.publish
    }

    /// Physical id of the publish dispatcher fleet.
    #[must_use]
    pub fn publish_dispatcher(&self) -> &str {
        &self.publish_dispatcher
    }

    /// Physical id of the author dispatcher fleet.
    #[must_use]
    pub fn author_dispatcher(&self) -> &str {
        &self.author_dispatcher
    }

    /// Physical id of the fleet playing `role`.
    #[must_use]
    pub fn get(&self, role: FleetRole) -> &str {
        match role {
            FleetRole::Publish => &self.publish,
            FleetRole::PublishDispatcher => &self.publish_dispatcher,
            FleetRole::AuthorDispatcher => &self.author_dispatcher,
        }
    }

    /// The role of the fleet with physical id `fleet`, if it is managed.
    #[must_use]
    pub fn role_of(&self, fleet: &str) -> Option<FleetRole> {
        FleetRole::ALL
            .into_iter()
            .find(|role| self.get(*role) == fleet)
    }
}

// Copyright (c) 2025, The Amqpio Authors
// MIT License
// All rights reserved.

//! # Instance Namespace Resolution
//!
//! Every queue name and routing key crossing into the broker client is
//! prefixed with the instance identity, so two instances sharing a broker
//! never collide on the same logical name.

/// The instance identity used to namespace broker-visible names.
///
/// Set once when the client is constructed, immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    instance: String,
}

impl Namespace {
    pub fn new(instance: impl Into<String>) -> Namespace {
        Namespace {
            instance: instance.into(),
        }
    }

    /// The instance identity itself.
    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Resolves a subroute into the broker-visible routing key.
    pub fn route_name(&self, subroute: &str) -> String {
        format!("{}.{}", self.instance, subroute)
    }

    /// Resolves a logical queue name into the broker-visible queue name.
    pub fn queue_name(&self, name: &str) -> String {
        format!("{}.{}", self.instance, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_route_and_queue_names_with_instance_prefix() {
        let ns = Namespace::new("svc-A");

        assert_eq!(ns.route_name("created"), "svc-A.created");
        assert_eq!(ns.queue_name("orders"), "svc-A.orders");
    }

    #[test]
    fn distinct_instances_never_collide_on_the_same_logical_name() {
        let a = Namespace::new("svc-A");
        let b = Namespace::new("svc-B");

        assert_ne!(a.route_name("created"), b.route_name("created"));
        assert_ne!(a.queue_name("orders"), b.queue_name("orders"));
    }

    #[test]
    fn instance_accessor_returns_the_identity() {
        assert_eq!(Namespace::new("amqpio-example").instance(), "amqpio-example");
    }
}

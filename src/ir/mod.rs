//! Target-agnostic description of the services to deploy.
//!
//! Analysis transformers populate containers, ports and environment; generator
//! transformers read the model after running it through [`preprocess`].

pub mod preprocessor;

pub use preprocessor::preprocess;

use crate::util::make_container_name_compliant;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ir {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub services: BTreeMap<String, Service>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub name: String,
    #[serde(default)]
    pub containers: Vec<Container>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub ports: Vec<u16>,
    #[serde(default)]
    pub env: Vec<EnvVar>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

/// A container together with the name generators publish it under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedContainer<'a> {
    pub service: &'a str,
    pub container: &'a Container,
    pub resource_name: String,
}

impl Ir {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            services: BTreeMap::new(),
        }
    }

    /// Adds a service, appending its containers when a service of the same
    /// name is already present.
    pub fn add_service(&mut self, service: Service) {
        match self.services.get_mut(&service.name) {
            Some(existing) => existing.containers.extend(service.containers),
            None => {
                self.services.insert(service.name.clone(), service);
            }
        }
    }

    pub fn merge(&mut self, other: Ir) {
        if self.name.is_empty() {
            self.name = other.name;
        }
        for (_, service) in other.services {
            self.add_service(service);
        }
    }

    /// Every declared container port across all services, sorted and unique.
    pub fn all_service_ports(&self) -> Vec<u16> {
        let mut ports: Vec<u16> = self
            .services
            .values()
            .flat_map(|s| s.containers.iter())
            .flat_map(|c| c.ports.iter().copied())
            .collect();
        ports.sort_unstable();
        ports.dedup();
        ports
    }

    pub fn container_count(&self) -> usize {
        self.services.values().map(|s| s.containers.len()).sum()
    }

    /// Every container with a resource name unique across the IR, in service
    /// then container order.
    ///
    /// A single-container service is published under its own name and a
    /// container of a larger service under `<service>-<container>`, both made
    /// container-name compliant. Single-container services claim their names
    /// first; a name already in use gets the first free `-2`, `-3`, ... suffix.
    pub fn resource_names(&self) -> Vec<NamedContainer<'_>> {
        let mut taken = BTreeSet::new();
        let mut single_names = BTreeMap::new();
        for (name, service) in &self.services {
            if service.containers.len() == 1 {
                let claimed = claim_name(&mut taken, make_container_name_compliant(name));
                single_names.insert(name.as_str(), claimed);
            }
        }

        let mut named = Vec::with_capacity(self.container_count());
        for (name, service) in &self.services {
            for container in &service.containers {
                let resource_name = match single_names.get(name.as_str()) {
                    Some(claimed) => claimed.clone(),
                    None => claim_name(
                        &mut taken,
                        make_container_name_compliant(&format!("{}-{}", name, container.name)),
                    ),
                };
                named.push(NamedContainer {
                    service: name,
                    container,
                    resource_name,
                });
            }
        }
        named
    }
}

fn claim_name(taken: &mut BTreeSet<String>, preferred: String) -> String {
    if taken.insert(preferred.clone()) {
        return preferred;
    }
    let mut suffix = 2;
    loop {
        let candidate = format!("{}-{}", preferred, suffix);
        if taken.insert(candidate.clone()) {
            warn!(name = %preferred, resource = %candidate, "Resource name already in use");
            return candidate;
        }
        suffix += 1;
    }
}

impl Service {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            containers: Vec::new(),
        }
    }

    pub fn with_container(mut self, container: Container) -> Self {
        self.containers.push(container);
        self
    }
}

impl Container {
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            ports: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.ports.push(port);
        self
    }

    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push(EnvVar {
            name: name.into(),
            value: value.into(),
        });
        self
    }
}

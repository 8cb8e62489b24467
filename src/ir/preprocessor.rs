//! Cross-service normalization applied before an IR reaches a generator.

use super::{Container, EnvVar, Ir, Service};
use std::collections::HashMap;
use tracing::debug;

/// Normalizes an IR so that generated output does not depend on upstream
/// insertion order.
///
/// - containers sharing a name within a service are folded into one: ports
///   are unioned by number, environment variables are overlaid with the later
///   contribution winning, and a non-empty later image replaces the earlier one
/// - containers are sorted by name; services are already keyed lexically
pub fn preprocess(mut ir: Ir) -> Ir {
    for (name, service) in ir.services.iter_mut() {
        if service.name.is_empty() {
            service.name = name.clone();
        }
        normalize_service(service);
    }

    debug!(
        ir = %ir.name,
        services = ir.services.len(),
        containers = ir.container_count(),
        "Preprocessed IR"
    );
    ir
}

fn normalize_service(service: &mut Service) {
    let mut merged: Vec<Container> = Vec::with_capacity(service.containers.len());
    let mut index_by_name: HashMap<String, usize> = HashMap::new();

    for container in std::mem::take(&mut service.containers) {
        match index_by_name.get(&container.name) {
            Some(&idx) => fold_container(&mut merged[idx], container),
            None => {
                index_by_name.insert(container.name.clone(), merged.len());
                let mut fresh = Container::new(container.name.clone(), String::new());
                fold_container(&mut fresh, container);
                merged.push(fresh);
            }
        }
    }

    merged.sort_by(|a, b| a.name.cmp(&b.name));
    service.containers = merged;
}

fn fold_container(target: &mut Container, incoming: Container) {
    if !incoming.image.is_empty() {
        target.image = incoming.image;
    }

    for port in incoming.ports {
        if !target.ports.contains(&port) {
            target.ports.push(port);
        }
    }

    for var in incoming.env {
        overlay_env(&mut target.env, var);
    }
}

fn overlay_env(env: &mut Vec<EnvVar>, var: EnvVar) {
    match env.iter_mut().find(|e| e.name == var.name) {
        Some(existing) => existing.value = var.value,
        None => env.push(var),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_pairs(container: &Container) -> Vec<(&str, &str)> {
        container
            .env
            .iter()
            .map(|e| (e.name.as_str(), e.value.as_str()))
            .collect()
    }

    #[test]
    fn test_duplicate_ports_unioned_by_number() {
        let mut ir = Ir::new("app");
        ir.add_service(
            Service::new("api")
                .with_container(Container::new("api", "api:1").with_port(8080).with_port(8443))
                .with_container(Container::new("api", "").with_port(8080).with_port(9090)),
        );

        let ir = preprocess(ir);
        let api = &ir.services["api"].containers;
        assert_eq!(api.len(), 1);
        assert_eq!(api[0].ports, vec![8080, 8443, 9090]);
        assert_eq!(api[0].image, "api:1");
    }

    #[test]
    fn test_env_later_value_wins() {
        let mut ir = Ir::new("app");
        ir.add_service(
            Service::new("api")
                .with_container(
                    Container::new("api", "api")
                        .with_env("PORT", "8080")
                        .with_env("MODE", "dev"),
                )
                .with_container(Container::new("api", "api").with_env("PORT", "9000")),
        );

        let ir = preprocess(ir);
        let api = &ir.services["api"].containers[0];
        assert_eq!(env_pairs(api), vec![("PORT", "9000"), ("MODE", "dev")]);
    }

    #[test]
    fn test_env_duplicates_within_one_container() {
        let mut ir = Ir::new("app");
        ir.add_service(Service::new("api").with_container(
            Container::new("api", "api")
                .with_env("A", "1")
                .with_env("A", "2"),
        ));

        let ir = preprocess(ir);
        assert_eq!(env_pairs(&ir.services["api"].containers[0]), vec![("A", "2")]);
    }

    #[test]
    fn test_containers_sorted_by_name() {
        let mut ir = Ir::new("app");
        ir.add_service(
            Service::new("api")
                .with_container(Container::new("zeta", "z"))
                .with_container(Container::new("alpha", "a"))
                .with_container(Container::new("mid", "m")),
        );

        let ir = preprocess(ir);
        let names: Vec<&str> = ir.services["api"]
            .containers
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_empty_service_name_filled_from_key() {
        let mut ir = Ir::new("app");
        ir.services.insert("orders".to_string(), Service::new(""));

        let ir = preprocess(ir);
        assert_eq!(ir.services["orders"].name, "orders");
    }

    #[test]
    fn test_preprocess_is_order_independent() {
        let build = |first: Container, second: Container| {
            let mut ir = Ir::new("app");
            ir.add_service(Service::new("svc").with_container(first).with_container(second));
            preprocess(ir)
        };

        let a = Container::new("a", "a").with_port(1);
        let b = Container::new("b", "b").with_port(2);
        assert_eq!(build(a.clone(), b.clone()), build(b, a));
    }
}

/*!
 * # Role-Based Access Control (RBAC) Module
 *
 * Permissions are rule-set strings of the form `resource.action`, e.g.
 * `build.change`. A user's `roles` column may hold either such rules directly
 * or the name of a role group below, which expands into its rules.
 */

use lazy_static::lazy_static;
use std::collections::{BTreeSet, HashMap};
use tracing::warn;

/// Rule-set permission names
pub mod consts {
    pub const PART_VIEW: &str = "part.view";
    pub const PART_ADD: &str = "part.add";
    pub const PART_CHANGE: &str = "part.change";
    pub const PART_DELETE: &str = "part.delete";

    pub const BUILD_VIEW: &str = "build.view";
    pub const BUILD_ADD: &str = "build.add";
    pub const BUILD_CHANGE: &str = "build.change";
    pub const BUILD_DELETE: &str = "build.delete";

    pub const STOCK_VIEW: &str = "stock.view";
    pub const STOCK_ADD: &str = "stock.add";
    pub const STOCK_CHANGE: &str = "stock.change";
    pub const STOCK_DELETE: &str = "stock.delete";
}

/// Resources that carry a rule set
pub const RULE_SETS: [&str; 3] = ["part", "build", "stock"];

/// Actions available on every rule set
pub const RULE_ACTIONS: [&str; 4] = ["view", "add", "change", "delete"];

/// Role group definition with associated permissions
#[derive(Debug, Clone)]
pub struct Role {
    pub name: &'static str,
    pub description: &'static str,
    pub permissions: Vec<&'static str>,
}

lazy_static! {
    pub static ref ROLES: HashMap<&'static str, Role> = {
        let mut roles = HashMap::new();

        roles.insert(
            "admin",
            Role {
                name: "admin",
                description: "Full access to every rule set",
                permissions: vec!["part.*", "build.*", "stock.*"],
            },
        );

        roles.insert(
            "engineer",
            Role {
                name: "engineer",
                description: "Maintains the part catalog and bills of materials",
                permissions: vec!["part.*", "build.view", "stock.view"],
            },
        );

        roles.insert(
            "production",
            Role {
                name: "production",
                description: "Runs build orders on the shop floor",
                permissions: vec![
                    "part.view",
                    "build.view",
                    "build.add",
                    "build.change",
                    "stock.view",
                    "stock.change",
                ],
            },
        );

        roles.insert(
            "viewer",
            Role {
                name: "viewer",
                description: "Read-only access",
                permissions: vec!["part.view", "build.view", "stock.view"],
            },
        );

        roles
    };
}

/// Whether `rule` is a well formed `resource.action` (or `resource.*`) string
pub fn is_rule(rule: &str) -> bool {
    match rule.split_once('.') {
        Some((resource, action)) => {
            RULE_SETS.contains(&resource) && (action == "*" || RULE_ACTIONS.contains(&action))
        }
        None => false,
    }
}

/// Expand role group names into their rules; literal rules pass through
pub fn expand_roles<S: AsRef<str>>(roles: &[S]) -> Vec<String> {
    let mut permissions = BTreeSet::new();
    for role in roles {
        let role = role.as_ref().trim();
        if let Some(group) = ROLES.get(role) {
            permissions.extend(group.permissions.iter().map(|p| p.to_string()));
        } else if is_rule(role) {
            permissions.insert(role.to_string());
        } else if !role.is_empty() {
            warn!(role, "Ignoring unknown role");
        }
    }
    permissions.into_iter().collect()
}

/// Whether `granted` covers `required`, honouring `resource.*` wildcards
pub fn permits(granted: &[String], required: &str) -> bool {
    granted.iter().any(|p| {
        p == required
            || p.strip_suffix(".*")
                .map_or(false, |resource| {
                    required
                        .split_once('.')
                        .map_or(false, |(r, _)| r == resource)
                })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_expand_and_rules_pass_through() {
        let perms = expand_roles(&["viewer", "build.change", "bogus"]);
        assert!(perms.contains(&"part.view".to_string()));
        assert!(perms.contains(&"build.change".to_string()));
        assert!(!perms.iter().any(|p| p == "bogus"));
    }

    #[test]
    fn wildcards_cover_every_action() {
        let perms = expand_roles(&["engineer"]);
        assert!(permits(&perms, consts::PART_DELETE));
        assert!(permits(&perms, consts::BUILD_VIEW));
        assert!(!permits(&perms, consts::BUILD_CHANGE));
    }

    #[test]
    fn rule_syntax() {
        assert!(is_rule("build.view"));
        assert!(is_rule("stock.*"));
        assert!(!is_rule("build"));
        assert!(!is_rule("order.view"));
        assert!(!is_rule("build.approve"));
    }
}

//! AWS Network Firewall building blocks shared by firewall policies and rule groups

pub mod custom_action;
pub mod encryption;

pub use custom_action::{
    ActionDefinition, CustomAction, Dimension, PublishMetricAction, expand_custom_actions,
    flatten_custom_actions,
};
pub use encryption::{
    EncryptionConfiguration, EncryptionType, expand_encryption_configuration,
    flatten_encryption_configuration,
};

use aws_sdk_networkfirewall::types::RuleOrder;

fn is_default_rule_order(order: Option<&str>) -> bool {
    match order {
        None | Some("") => true,
        Some(order) => order == RuleOrder::DefaultActionOrder.as_str(),
    }
}

/// Whether a rule order change on an existing resource needs a replacement
///
/// Moving between default action order (unset counts as default) and any
/// other order can't be done in place. `resource_id` is empty before the
/// resource exists.
pub fn rule_order_forces_replacement(
    resource_id: &str,
    old: Option<&str>,
    new: Option<&str>,
) -> bool {
    if resource_id.is_empty() || old == new {
        return false;
    }
    is_default_rule_order(old) != is_default_rule_order(new)
}

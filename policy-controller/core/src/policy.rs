use crate::{
    ActionDefinitionId, ActionName, ClassifierDefinitionId, ClassifierName, ContractId, EpgKey,
    RuleName, SubjectName, TenantId,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Marks which side of a resolved policy is logically outside of the managed domain.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExternalImplicitGroup {
    ConsumerEpg,
    ProviderEpg,
}

/// Whether an endpoint acts as the provider or the consumer of a policy relation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Participation {
    Provider,
    Consumer,
}

/// Identifies a rule group: the rules of a contract's subject, scoped to a tenant.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RuleGroupKey {
    pub tenant_id: TenantId,
    pub contract_id: ContractId,
    pub subject_name: SubjectName,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    In,
    Out,
    Bidirectional,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Value {
    Int(i64),
    String(String),
    Range { min: i64, max: i64 },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ParameterValue {
    pub name: String,
    pub value: Value,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Classifier {
    pub name: ClassifierName,
    pub classifier_definition_id: ClassifierDefinitionId,
    pub direction: Direction,
    #[serde(default)]
    pub parameters: Vec<ParameterValue>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Action {
    pub name: ActionName,
    pub action_definition_id: ActionDefinitionId,
    #[serde(default)]
    pub order: Option<u32>,
    #[serde(default)]
    pub parameters: Vec<ParameterValue>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResolvedRule {
    pub name: RuleName,
    #[serde(default)]
    pub order: Option<u32>,
    #[serde(default)]
    pub classifiers: Vec<Classifier>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

/// An ordered set of resolved rules. Rule groups are emitted verbatim in renderer
/// configurations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PolicyRuleGroup {
    #[serde(flatten)]
    pub key: RuleGroupKey,
    #[serde(default)]
    pub order: Option<u32>,
    #[serde(default)]
    pub resolved_rules: Vec<ResolvedRule>,
}

/// The rule groups that apply between a consumer and a provider endpoint group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResolvedPolicy {
    pub consumer: EpgKey,
    pub provider: EpgKey,
    #[serde(default)]
    pub external_implicit_group: Option<ExternalImplicitGroup>,
    #[serde(default)]
    pub rule_groups: Vec<PolicyRuleGroup>,
}

/// The resolved-policies collection, as published by the upstream policy resolver.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ResolvedPolicies {
    #[serde(default)]
    pub resolved_policies: Vec<ResolvedPolicy>,
}

// === impl Participation ===

impl Participation {
    /// Indicates whether an endpoint in this role would be a member of the policy's external
    /// implicit group.
    pub fn is_external_in(self, eig: Option<ExternalImplicitGroup>) -> bool {
        matches!(
            (self, eig),
            (Self::Provider, Some(ExternalImplicitGroup::ProviderEpg))
                | (Self::Consumer, Some(ExternalImplicitGroup::ConsumerEpg))
        )
    }
}

impl fmt::Display for Participation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provider => f.write_str("provider"),
            Self::Consumer => f.write_str("consumer"),
        }
    }
}

// === impl RuleGroupKey ===

impl RuleGroupKey {
    pub fn new(
        tenant_id: impl Into<TenantId>,
        contract_id: impl Into<ContractId>,
        subject_name: impl Into<SubjectName>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            contract_id: contract_id.into(),
            subject_name: subject_name.into(),
        }
    }
}

impl fmt::Display for RuleGroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.tenant_id, self.contract_id, self.subject_name
        )
    }
}

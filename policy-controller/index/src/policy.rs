use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use gbp_policy_controller_core::{
    policy::{PolicyRuleGroup, ResolvedPolicies, ResolvedPolicy, RuleGroupKey},
    EpgKey,
};

/// Indexes resolved policies by their (consumer, provider) endpoint group pair.
///
/// Every pair returned by [`Self::consumer_peers`] or [`Self::provider_peers`] has a policy. When
/// the input repeats a pair or a rule group key, the last entry wins.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedPolicyInfo {
    by_pair: HashMap<(EpgKey, EpgKey), ResolvedPolicy>,
    consumers_by_provider: HashMap<EpgKey, HashSet<EpgKey>>,
    providers_by_consumer: HashMap<EpgKey, HashSet<EpgKey>>,
    rule_groups: HashMap<RuleGroupKey, PolicyRuleGroup>,
}

// === impl ResolvedPolicyInfo ===

impl ResolvedPolicyInfo {
    pub fn new(policies: &ResolvedPolicies) -> Self {
        let by_pair = policies
            .resolved_policies
            .iter()
            .map(|p| ((p.consumer.clone(), p.provider.clone()), p.clone()))
            .collect::<HashMap<_, _>>();

        let mut consumers_by_provider = HashMap::<EpgKey, HashSet<EpgKey>>::default();
        let mut providers_by_consumer = HashMap::<EpgKey, HashSet<EpgKey>>::default();
        for (consumer, provider) in by_pair.keys() {
            consumers_by_provider
                .entry(provider.clone())
                .or_default()
                .insert(consumer.clone());
            providers_by_consumer
                .entry(consumer.clone())
                .or_default()
                .insert(provider.clone());
        }

        let rule_groups = policies
            .resolved_policies
            .iter()
            .flat_map(|p| &p.rule_groups)
            .map(|group| (group.key.clone(), group.clone()))
            .collect::<HashMap<_, _>>();

        Self {
            by_pair,
            consumers_by_provider,
            providers_by_consumer,
            rule_groups,
        }
    }

    /// Returns the endpoint groups that consume from `provider`.
    pub fn consumer_peers<'a>(
        &'a self,
        provider: &EpgKey,
    ) -> impl Iterator<Item = &'a EpgKey> + 'a {
        self.consumers_by_provider.get(provider).into_iter().flatten()
    }

    /// Returns the endpoint groups that `consumer` consumes from.
    pub fn provider_peers<'a>(
        &'a self,
        consumer: &EpgKey,
    ) -> impl Iterator<Item = &'a EpgKey> + 'a {
        self.providers_by_consumer.get(consumer).into_iter().flatten()
    }

    pub fn policy(&self, consumer: &EpgKey, provider: &EpgKey) -> Option<&ResolvedPolicy> {
        self.by_pair.get(&(consumer.clone(), provider.clone()))
    }

    pub fn rule_group(&self, key: &RuleGroupKey) -> Option<&PolicyRuleGroup> {
        self.rule_groups.get(key)
    }

    pub fn len(&self) -> usize {
        self.by_pair.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_pair.is_empty()
    }
}

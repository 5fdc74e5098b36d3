//! Profile selection.

use super::condition::Condition;
use super::ServerListProfile;
use crate::error::{ConditionResult, ProfileError, ProfileResult};
use crate::placeholders::PlaceholderSet;
use tracing::{debug, warn};

#[derive(Debug)]
struct Candidate {
    profile: ServerListProfile,
    condition: Option<ConditionResult<Condition>>,
}

impl Candidate {
    fn compile(profile: ServerListProfile) -> Self {
        let condition = profile.condition.as_deref().map(|source| {
            let parsed = Condition::parse(source);
            if let Err(e) = &parsed {
                warn!(
                    "Profile {} has an invalid condition and will never match: {}",
                    profile.name, e
                );
            }
            parsed
        });
        Self { profile, condition }
    }

    fn matches(&self, set: &PlaceholderSet) -> bool {
        match &self.condition {
            None => true,
            Some(Err(_)) => false,
            Some(Ok(condition)) => match condition.evaluate(set) {
                Ok(result) => result,
                Err(e) => {
                    warn!(
                        "Condition of profile {} could not be evaluated: {}",
                        self.profile.name, e
                    );
                    false
                }
            },
        }
    }
}

/// An immutable, ordered set of profiles with exactly one default.
#[derive(Debug)]
pub struct ProfileSnapshot {
    candidates: Vec<Candidate>,
    default_index: usize,
}

impl ProfileSnapshot {
    pub fn new(mut profiles: Vec<ServerListProfile>) -> ProfileResult<Self> {
        let defaults: Vec<String> = profiles
            .iter()
            .filter(|p| p.is_default)
            .map(|p| p.name.clone())
            .collect();
        if defaults.len() > 1 {
            return Err(ProfileError::DuplicateDefault(defaults));
        }

        // stable: equal priorities keep their load order
        profiles.sort_by(|a, b| b.priority.cmp(&a.priority));
        let default_index = profiles
            .iter()
            .position(|p| p.is_default)
            .ok_or(ProfileError::MissingDefault)?;

        Ok(Self {
            candidates: profiles.into_iter().map(Candidate::compile).collect(),
            default_index,
        })
    }

    pub fn default_profile(&self) -> &ServerListProfile {
        &self.candidates[self.default_index].profile
    }

    /// Profiles in evaluation order.
    pub fn profiles(&self) -> impl Iterator<Item = &ServerListProfile> {
        self.candidates.iter().map(|c| &c.profile)
    }

    pub fn get(&self, name: &str) -> Option<&ServerListProfile> {
        self.profiles().find(|p| p.name == name)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// First profile in priority order whose condition holds, else the default.
    ///
    /// The default takes part in the scan at its own priority. When its
    /// condition is false it is skipped there but still ends the search.
    pub fn select(&self, set: &PlaceholderSet) -> &ServerListProfile {
        let selected = self
            .candidates
            .iter()
            .find(|candidate| candidate.matches(set))
            .map(|candidate| &candidate.profile)
            .unwrap_or_else(|| self.default_profile());
        debug!("Selected profile {}", selected.name);
        selected
    }
}

/// Collects replacements and resolves the profile for one ping.
pub struct ProfileManager<'s> {
    snapshot: &'s ProfileSnapshot,
    replacements: PlaceholderSet,
}

impl<'s> ProfileManager<'s> {
    pub fn new(snapshot: &'s ProfileSnapshot) -> Self {
        Self {
            snapshot,
            replacements: PlaceholderSet::new(),
        }
    }

    pub fn replacements(mut self, set: &PlaceholderSet) -> Self {
        self.replacements.overlay(set);
        self
    }

    pub fn profile(&self) -> &'s ServerListProfile {
        self.snapshot.select(&self.replacements)
    }
}

//! CSL package registry and the eight-tier model matcher
//!
//! Every registered model is indexed under up to eight keys, one per match
//! tier, e.g. `B738 SWA SHAMU` for the exact tier or
//! `B731 B732 B733 B734 B735 B736 B737 B738 B739 SWA` for the group+airline
//! tier. A query builds the same keys and probes tiers from most to least
//! specific; within a tier, packages are probed in registration order and the
//! first model registered under a key owns it.

use std::collections::HashMap;

use crate::offset::VerticalOffset;

/// One rule of the fallback search, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchTier {
    IcaoAirlineLivery,
    IcaoAirline,
    GroupAirlineLivery,
    GroupAirline,
    IcaoLivery,
    Icao,
    GroupLivery,
    Group,
}

impl MatchTier {
    pub const ALL: [MatchTier; 8] = [
        MatchTier::IcaoAirlineLivery,
        MatchTier::IcaoAirline,
        MatchTier::GroupAirlineLivery,
        MatchTier::GroupAirline,
        MatchTier::IcaoLivery,
        MatchTier::Icao,
        MatchTier::GroupLivery,
        MatchTier::Group,
    ];

    /// Match quality reported for this tier; 0 is best
    pub fn quality(self) -> i32 {
        self as i32
    }

    fn uses_group(self) -> bool {
        matches!(
            self,
            MatchTier::GroupAirlineLivery
                | MatchTier::GroupAirline
                | MatchTier::GroupLivery
                | MatchTier::Group
        )
    }

    fn uses_airline(self) -> bool {
        matches!(
            self,
            MatchTier::IcaoAirlineLivery
                | MatchTier::IcaoAirline
                | MatchTier::GroupAirlineLivery
                | MatchTier::GroupAirline
        )
    }

    fn uses_livery(self) -> bool {
        matches!(
            self,
            MatchTier::IcaoAirlineLivery
                | MatchTier::GroupAirlineLivery
                | MatchTier::IcaoLivery
                | MatchTier::GroupLivery
        )
    }

    /// Key for this tier, or `None` if a required part is missing
    fn key(self, icao: &str, group: Option<&str>, airline: &str, livery: &str) -> Option<String> {
        let head = if self.uses_group() { group? } else { icao };
        if head.is_empty() {
            return None;
        }
        let mut key = head.to_string();
        if self.uses_airline() {
            if airline.is_empty() {
                return None;
            }
            key.push(' ');
            key.push_str(airline);
        }
        if self.uses_livery() {
            if livery.is_empty() {
                return None;
            }
            key.push(' ');
            key.push_str(livery);
        }
        Some(key)
    }
}

/// Match quality when nothing matched
pub const NO_MATCH: i32 = -1;

/// Equipment groups: ICAO type to the key of its group
#[derive(Debug, Clone, Default)]
pub struct TypeGroups {
    groups: HashMap<String, String>,
}

impl TypeGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a group; its key is the member list joined by spaces
    pub fn add_group(&mut self, members: &[&str]) {
        let key = members.join(" ");
        for member in members {
            self.groups.insert(member.to_string(), key.clone());
        }
    }

    /// Group key of `icao`, if it belongs to one
    pub fn group_of(&self, icao: &str) -> Option<&str> {
        self.groups.get(icao).map(String::as_str)
    }
}

/// One installable model
#[derive(Debug, Clone, Default)]
pub struct ModelDescriptor {
    /// Directories from the package root down to the object
    pub dir_names: Vec<String>,
    pub object_name: String,
    pub texture_name: String,
    pub icao: String,
    pub airline: String,
    pub livery: String,
    /// Geometry path
    pub obj_path: String,
    /// Explicit texture, overriding the one the object declares
    pub texture_path: Option<String>,
    /// Explicit lit texture
    pub lit_texture_path: Option<String>,
    pub vertical_offset: VerticalOffset,
}

impl ModelDescriptor {
    /// Directories, object and texture names joined by spaces
    pub fn model_name(&self) -> String {
        let mut parts: Vec<&str> = self.dir_names.iter().map(String::as_str).collect();
        parts.push(&self.object_name);
        if !self.texture_name.is_empty() {
            parts.push(&self.texture_name);
        }
        parts.join(" ")
    }
}

/// A CSL package and its match tables
#[derive(Debug, Clone)]
pub struct CslPackage {
    pub name: String,
    pub path: String,
    planes: Vec<ModelDescriptor>,
    matches: [HashMap<String, usize>; 8],
}

impl CslPackage {
    pub fn planes(&self) -> &[ModelDescriptor] {
        &self.planes
    }
}

/// Index of a model inside the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelRef {
    pub package: usize,
    pub plane: usize,
}

/// Outcome of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchResult {
    pub model: Option<ModelRef>,
    /// Tier index of the match, or [`NO_MATCH`]
    pub quality: i32,
}

/// Summary of an installed model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub name: String,
    pub icao: String,
    pub airline: String,
    pub livery: String,
}

/// Every installed package, in registration order
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    packages: Vec<CslPackage>,
    groups: TypeGroups,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_groups(groups: TypeGroups) -> Self {
        Self {
            packages: Vec::new(),
            groups,
        }
    }

    pub fn groups(&self) -> &TypeGroups {
        &self.groups
    }

    /// Register a type group and re-index every installed model against it
    pub fn add_group(&mut self, members: &[&str]) {
        self.groups.add_group(members);
        for pkg in &mut self.packages {
            for table in &mut pkg.matches {
                table.clear();
            }
            for index in 0..pkg.planes.len() {
                index_plane(&self.groups, pkg, index);
            }
        }
    }

    /// Register an empty package, returning its index
    pub fn add_package(&mut self, name: &str, path: &str) -> usize {
        log::info!("Registered CSL package {} ({})", name, path);
        self.packages.push(CslPackage {
            name: name.to_string(),
            path: path.to_string(),
            planes: Vec::new(),
            matches: Default::default(),
        });
        self.packages.len() - 1
    }

    /// Add a model to a package and index it under every tier key it has
    ///
    /// Keys already owned by an earlier model of the package stay with it.
    pub fn add_plane(&mut self, package: usize, model: ModelDescriptor) -> Option<ModelRef> {
        let pkg = self.packages.get_mut(package)?;
        let index = pkg.planes.len();
        pkg.planes.push(model);
        index_plane(&self.groups, pkg, index);

        Some(ModelRef {
            package,
            plane: index,
        })
    }

    pub fn packages(&self) -> &[CslPackage] {
        &self.packages
    }

    pub fn model(&self, model: ModelRef) -> Option<&ModelDescriptor> {
        self.packages.get(model.package)?.planes.get(model.plane)
    }

    pub fn model_mut(&mut self, model: ModelRef) -> Option<&mut ModelDescriptor> {
        self.packages
            .get_mut(model.package)?
            .planes
            .get_mut(model.plane)
    }

    fn search(&self, icao: &str, airline: &str, livery: &str) -> MatchResult {
        let group = self.groups.group_of(icao);
        for tier in MatchTier::ALL {
            let Some(key) = tier.key(icao, group, airline, livery) else {
                continue;
            };
            for (package, pkg) in self.packages.iter().enumerate() {
                if let Some(&plane) = pkg.matches[tier as usize].get(&key) {
                    return MatchResult {
                        model: Some(ModelRef { package, plane }),
                        quality: tier.quality(),
                    };
                }
            }
        }
        MatchResult {
            model: None,
            quality: NO_MATCH,
        }
    }

    /// Best model for a type/airline/livery
    ///
    /// With `use_default`, a failed search falls back to `default_icao`; the
    /// quality still reports [`NO_MATCH`].
    pub fn match_plane(
        &self,
        icao: &str,
        airline: &str,
        livery: &str,
        use_default: Option<&str>,
    ) -> MatchResult {
        let result = self.search(icao, airline, livery);
        if result.model.is_some() {
            return result;
        }
        match use_default {
            Some(default_icao) => MatchResult {
                model: self.search(default_icao, "", "").model,
                quality: NO_MATCH,
            },
            None => result,
        }
    }

    /// Whether any model exists for this type or its group
    pub fn is_icao_valid(&self, icao: &str) -> bool {
        self.search(icao, "", "").model.is_some()
    }

    /// Quality a match would have, without the default fallback
    pub fn model_match_quality(&self, icao: &str, airline: &str, livery: &str) -> i32 {
        self.search(icao, airline, livery).quality
    }

    /// Model whose name equals `name`, ignoring ASCII case
    pub fn model_by_name(&self, name: &str) -> Option<ModelRef> {
        self.iter_models()
            .find(|(_, model)| model.model_name().eq_ignore_ascii_case(name))
            .map(|(model_ref, _)| model_ref)
    }

    /// Number of installed models across packages
    pub fn model_count(&self) -> usize {
        self.packages.iter().map(|pkg| pkg.planes.len()).sum()
    }

    /// Summary of the `index`-th model, counting across packages
    pub fn model_info(&self, index: usize) -> Option<ModelInfo> {
        self.iter_models().nth(index).map(|(_, model)| ModelInfo {
            name: model.model_name(),
            icao: model.icao.clone(),
            airline: model.airline.clone(),
            livery: model.livery.clone(),
        })
    }

    fn iter_models(&self) -> impl Iterator<Item = (ModelRef, &ModelDescriptor)> {
        self.packages.iter().enumerate().flat_map(|(package, pkg)| {
            pkg.planes
                .iter()
                .enumerate()
                .map(move |(plane, model)| (ModelRef { package, plane }, model))
        })
    }
}

fn index_plane(groups: &TypeGroups, pkg: &mut CslPackage, index: usize) {
    let model = &pkg.planes[index];
    let group = groups.group_of(&model.icao);
    for tier in MatchTier::ALL {
        if let Some(key) = tier.key(&model.icao, group, &model.airline, &model.livery) {
            pkg.matches[tier as usize].entry(key).or_insert(index);
        }
    }
}

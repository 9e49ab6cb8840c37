//! # Reference Resolution
//!
//! The `RefResolver` walks a document tree depth-first, rewrites every
//! reference it meets into an internal `#/...` pointer, and collects the
//! referenced subtrees into a [`MergedTree`] that the bundler writes into the
//! final document.
//!
//! ## Resolution rules
//!
//! - **Internal** references (`#/a/b`) resolve against the document that owns
//!   the node. Inside the entry document they already point at the right
//!   place and are only checked. Inside a loaded document the target is
//!   walked and merged like an external one.
//! - **External** and **remote** references are resolved to a location key,
//!   loaded through the [`ContentLoader`], walked in a context rooted at the
//!   target's directory, and merged. A reference back into the entry
//!   document is treated as an internal reference of the entry document.
//!
//! Every target is keyed by `(location key, fragment)` in the
//! [`ResolutionCache`]. The first reference to reach a target fixes its
//! pointer and starts the walk; any later reference (a diamond, or a cycle
//! arriving while the walk is still in progress) just receives the pointer.
//! That single check is what bounds the recursion.
//!
//! Each key claims its own placement in the [`MergedTree`]. A placement
//! already owned by another key, or holding content of the entry document,
//! is never shared: the later target gets a suffixed name instead.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use log::debug;
use serde_yaml::Value as YamlValue;

use crate::cache::{RefKey, ResolutionCache, ResolutionState};
use crate::config::{BundleOptions, MergeRoot};
use crate::error::{Error, Result};
use crate::loader::ContentLoader;
use crate::merge::yaml::locate;
use crate::merge::{parse_fragment, pointer, MergedTree};
use crate::path::{file_stem, resolve, Location};
use crate::reference::{self, Category, Reference};

/// Where the node being walked comes from
#[derive(Debug, Clone)]
pub struct Context {
    /// Location key of the owning document
    pub file: String,
    /// Directory for relative references, as in [`Location::directory`]
    pub directory: String,
    /// Document that internal references resolve against
    pub document: Rc<YamlValue>,
    /// Component category of the current position, when known
    pub category: Option<Category>,
    /// Whether the owning document is the entry document
    pub is_root: bool,
}

impl Context {
    /// Context for the entry document
    pub fn root(location: &Location, document: Rc<YamlValue>) -> Self {
        Self {
            file: location.key.clone(),
            directory: location.directory.clone(),
            document,
            category: None,
            is_root: true,
        }
    }

    /// Context for a freshly loaded document
    pub fn for_document(
        location: &Location,
        document: Rc<YamlValue>,
        category: Option<Category>,
    ) -> Self {
        Self {
            file: location.key.clone(),
            directory: location.directory.clone(),
            document,
            category,
            is_root: false,
        }
    }

    /// Context of the value stored under `field`
    pub fn descend(&self, field: &str) -> Self {
        Self {
            category: Category::descend(self.category, field),
            ..self.clone()
        }
    }

    fn with_category(&self, category: Option<Category>) -> Self {
        Self {
            category,
            ..self.clone()
        }
    }
}

/// Recursive reference resolver for one bundle run
pub struct RefResolver<'a, 'l> {
    options: &'a BundleOptions,
    loader: &'a mut ContentLoader<'l>,
    base: String,
    entry: Context,
    resolutions: ResolutionCache,
    merged: MergedTree,
}

impl<'a, 'l> RefResolver<'a, 'l> {
    /// Create a resolver whose local locations are relative to `base`.
    ///
    /// `entry` is the context of the entry document being bundled.
    pub fn new(
        options: &'a BundleOptions,
        loader: &'a mut ContentLoader<'l>,
        base: &str,
        entry: &Context,
    ) -> Self {
        Self {
            options,
            loader,
            base: base.to_string(),
            entry: entry.clone(),
            resolutions: ResolutionCache::new(),
            merged: MergedTree::new(),
        }
    }

    /// Resolve a reference target string against the bundle base.
    pub fn location_of(&self, target: &str, ctx: &Context) -> Result<Location> {
        resolve(target, &self.base, &ctx.directory)
    }

    /// Load the document at `location`.
    pub fn load(&mut self, location: &Location) -> Result<Rc<YamlValue>> {
        self.loader.load(location)
    }

    /// Walk `node` in place, rewriting every reference in it.
    pub fn walk(&mut self, node: &mut YamlValue, ctx: &Context) -> Result<()> {
        if let Some(target) = reference::target_of(node).map(str::to_string) {
            let pointer = self.resolve_reference(&target, ctx)?;
            debug!("Rewrote {} -> {} in {}", target, pointer, ctx.file);
            reference::set_target(node, &pointer);
            return Ok(());
        }

        match node {
            YamlValue::Mapping(map) => {
                for (key, child) in map.iter_mut() {
                    let child_ctx = match key.as_str() {
                        Some(field) => ctx.descend(field),
                        None => ctx.clone(),
                    };
                    self.walk(child, &child_ctx)?;
                }
            }
            YamlValue::Sequence(seq) => {
                for child in seq.iter_mut() {
                    self.walk(child, ctx)?;
                }
            }
            YamlValue::Tagged(tagged) => self.walk(&mut tagged.value, ctx)?,
            _ => {}
        }
        Ok(())
    }

    /// Resolve one reference and return the internal pointer replacing it.
    pub fn resolve_reference(&mut self, target: &str, ctx: &Context) -> Result<String> {
        match Reference::classify(target) {
            Reference::Internal(fragment) => self.resolve_internal(target, fragment, ctx),
            Reference::External(_) | Reference::Remote(_) => self.resolve_external(target, ctx),
        }
    }

    fn resolve_internal(&mut self, target: &str, fragment: &str, ctx: &Context) -> Result<String> {
        let key = RefKey::new(&ctx.file, Some(fragment));
        if let Some(pointer) = self.cached(&key) {
            return Ok(pointer);
        }

        let segments = parse_fragment(fragment);
        let subtree = locate(&ctx.document, &segments, target, &ctx.file)?.clone();

        if ctx.is_root {
            // Already part of the bundled document, walked in place there.
            let pointer = pointer(&segments);
            self.resolutions.begin(key.clone(), pointer.clone());
            self.resolutions.complete(&key);
            return Ok(pointer);
        }

        let stem = file_stem(&ctx.file);
        let placement = self.placement(&segments, ctx.category, &stem);
        let placement = self.claim(&key, placement, &stem);
        let category = Category::from_segments(&placement).or(ctx.category);
        self.merge_target(key, placement, subtree, &ctx.with_category(category))
    }

    fn resolve_external(&mut self, target: &str, ctx: &Context) -> Result<String> {
        let location = self.location_of(target, ctx)?;
        if location.key == self.entry.file {
            let entry = self.entry.clone();
            let fragment = location.fragment.as_deref().unwrap_or_default();
            debug!("Reference back into the entry document: {}", target);
            return self.resolve_internal(target, fragment, &entry);
        }

        let key = RefKey::new(&location.key, location.fragment.as_deref());
        if let Some(pointer) = self.cached(&key) {
            return Ok(pointer);
        }

        let document = self.load(&location)?;
        let segments = parse_fragment(location.fragment.as_deref().unwrap_or_default());
        let subtree = locate(&document, &segments, target, &location.key)?.clone();

        let stem = location.stem();
        let placement = self.placement(&segments, ctx.category, &stem);
        let placement = self.claim(&key, placement, &stem);
        let category = Category::from_segments(&placement).or(ctx.category);
        let child_ctx = Context::for_document(&location, document, category);
        self.merge_target(key, placement, subtree, &child_ctx)
    }

    /// Pointer of a target seen before, if any.
    fn cached(&self, key: &RefKey) -> Option<String> {
        let resolution = self.resolutions.get(key)?;
        match resolution.state {
            ResolutionState::InProgress => debug!("Cycle through {}", key),
            ResolutionState::Merged => debug!("Already resolved: {}", key),
        }
        Some(resolution.pointer.clone())
    }

    /// Record `key`, walk its subtree, and queue the result for merging.
    fn merge_target(
        &mut self,
        key: RefKey,
        placement: Vec<String>,
        subtree: YamlValue,
        ctx: &Context,
    ) -> Result<String> {
        let pointer = pointer(&placement);
        self.resolutions.begin(key.clone(), pointer.clone());
        self.fill(key, subtree, ctx)?;
        Ok(pointer)
    }

    fn fill(&mut self, key: RefKey, mut subtree: YamlValue, ctx: &Context) -> Result<()> {
        self.walk(&mut subtree, ctx)?;
        self.merged.insert(key.clone(), subtree)?;
        self.resolutions.complete(&key);
        Ok(())
    }

    /// Claim a placement for `key` that no other target and no content of
    /// the entry document already uses.
    fn claim(&mut self, key: &RefKey, placement: Vec<String>, stem: &str) -> Vec<String> {
        let entry = &self.entry.document;
        let claimed = self.merged.claim(key, placement.clone(), stem, |segments| {
            locate(entry, segments, "", "").is_ok()
        });
        if claimed != placement {
            debug!("{} is taken, merging {} at {}", pointer(&placement), key, pointer(&claimed));
        }
        claimed
    }

    /// Segments of the location a target is merged at.
    ///
    /// With [`MergeRoot::Components`], a leading `components` segment is
    /// dropped and the category of the referencing position is prefixed when
    /// the fragment does not start with one. An empty fragment (a whole
    /// document) is named after the file stem.
    pub fn placement(&self, segments: &[String], category: Option<Category>, stem: &str) -> Vec<String> {
        let mut segments = segments.to_vec();
        match self.options.merge_root {
            MergeRoot::Document => {
                if segments.is_empty() {
                    segments.push(stem.to_string());
                }
                segments
            }
            MergeRoot::Components => {
                if segments.len() > 1 && segments[0] == "components" {
                    segments.remove(0);
                }
                if segments.is_empty() {
                    segments.push(stem.to_string());
                }

                let mut placement = vec!["components".to_string()];
                let named = Category::from_name(&segments[0]).is_some() && segments.len() > 1;
                if !named {
                    if let Some(category) = category {
                        placement.push(category.as_str().to_string());
                    }
                }
                placement.extend(segments);
                placement
            }
        }
    }

    /// Resolve the entries of the entry document's `components` object.
    ///
    /// With [`MergeRoot::Components`], an entry that is itself an external or
    /// remote reference is merged into its own slot instead of a location
    /// derived from the target. Every such slot is reserved before anything
    /// is walked, so a reference reaching the same target from elsewhere
    /// lands on the slot too. Everything else is walked as usual.
    pub fn resolve_components(&mut self, components: &mut YamlValue, ctx: &Context) -> Result<()> {
        if !components.is_mapping() {
            return self.walk(components, ctx);
        }
        let slots = match self.options.merge_root {
            MergeRoot::Components => self.reserve_slots(components, ctx)?,
            MergeRoot::Document => HashMap::new(),
        };

        for (category, entries) in components.as_mapping_mut().into_iter().flatten() {
            let Some(category) = category.as_str().map(str::to_string) else {
                self.walk(entries, ctx)?;
                continue;
            };
            let category_ctx = ctx.descend(&category);
            if !entries.is_mapping() {
                self.walk(entries, &category_ctx)?;
                continue;
            }

            for (name, node) in entries.as_mapping_mut().into_iter().flatten() {
                let slot = name
                    .as_str()
                    .and_then(|name| slots.get(&(category.clone(), name.to_string())));
                match slot {
                    Some((target, key)) => {
                        let pointer = self.fill_slot(target, key, &category_ctx)?;
                        debug!("Rewrote {} -> {} in {}", target, pointer, ctx.file);
                        reference::set_target(node, &pointer);
                    }
                    None => self.walk(node, &category_ctx)?,
                }
            }
        }
        Ok(())
    }

    /// Claim a slot for every `components` entry that references another
    /// document. Keyed by `(category, name)`.
    fn reserve_slots(
        &mut self,
        components: &YamlValue,
        ctx: &Context,
    ) -> Result<HashMap<(String, String), (String, RefKey)>> {
        let mut slots = HashMap::new();
        for (category, entries) in components.as_mapping().into_iter().flatten() {
            let (Some(category), Some(entries)) = (category.as_str(), entries.as_mapping()) else {
                continue;
            };
            let category_ctx = ctx.descend(category);

            for (name, node) in entries {
                let (name, target) = match (name.as_str(), Reference::from_value(node)) {
                    (Some(name), Some(Reference::External(target)))
                    | (Some(name), Some(Reference::Remote(target))) => (name, target),
                    _ => continue,
                };
                let location = self.location_of(target, &category_ctx)?;
                let key = RefKey::new(&location.key, location.fragment.as_deref());
                if location.key == self.entry.file || self.resolutions.get(&key).is_some() {
                    continue;
                }

                let slot = vec!["components".to_string(), category.to_string(), name.to_string()];
                debug!("Reserved {} for {}", pointer(&slot), key);
                self.resolutions.begin(key.clone(), pointer(&slot));
                self.merged.claim_slot(&key, slot);
                slots.insert((category.to_string(), name.to_string()), (target.to_string(), key));
            }
        }
        Ok(slots)
    }

    /// Load, walk and merge the target of a reserved slot.
    fn fill_slot(&mut self, target: &str, key: &RefKey, ctx: &Context) -> Result<String> {
        let location = self.location_of(target, ctx)?;
        let document = self.load(&location)?;
        let segments = parse_fragment(location.fragment.as_deref().unwrap_or_default());
        let subtree = locate(&document, &segments, target, &location.key)?.clone();

        let placement = self.merged.placement(key).map(<[String]>::to_vec).unwrap_or_default();
        let category = Category::from_segments(&placement).or(ctx.category);
        let child_ctx = Context::for_document(&location, document, category);
        self.fill(key.clone(), subtree, &child_ctx)?;
        Ok(pointer(&placement))
    }

    /// Splice the path items of `paths` in place.
    ///
    /// A path item that is an external or remote reference is replaced by
    /// the resolved content it points at, following chained path-item
    /// references, including internal ones inside loaded documents.
    /// Anything else is walked like any other node.
    pub fn resolve_paths(&mut self, paths: &mut YamlValue, ctx: &Context) -> Result<()> {
        if !paths.is_mapping() {
            return self.walk(paths, ctx);
        }

        for (path, item) in paths.as_mapping_mut().into_iter().flatten() {
            debug!("Resolving path item {:?}", path.as_str().unwrap_or_default());
            self.splice_path_item(item, ctx, &mut HashSet::new())?;
        }
        Ok(())
    }

    fn splice_path_item(
        &mut self,
        item: &mut YamlValue,
        ctx: &Context,
        seen: &mut HashSet<RefKey>,
    ) -> Result<()> {
        let (target, fragment, next) = match Reference::from_value(item) {
            Some(Reference::External(target)) | Some(Reference::Remote(target)) => {
                let target = target.to_string();
                let location = self.location_of(&target, ctx)?;
                let document = self.load(&location)?;
                let fragment = location.fragment.clone().unwrap_or_default();
                (target, fragment, Context::for_document(&location, document, None))
            }
            // Entry document links stay as pointers; anywhere else they are one more link
            Some(Reference::Internal(fragment)) if !ctx.is_root => {
                let target = format!("#{}", fragment);
                (target, fragment.to_string(), ctx.with_category(None))
            }
            _ => return self.walk(item, ctx),
        };

        let key = RefKey::new(&next.file, Some(&fragment));
        if !seen.insert(key.clone()) {
            return Err(Error::InvalidReference {
                reference: target,
                message: format!("circular path item reference through {}", key),
            });
        }

        let segments = parse_fragment(&fragment);
        let mut subtree = locate(&next.document, &segments, &target, &next.file)?.clone();
        self.splice_path_item(&mut subtree, &next, seen)?;
        *item = subtree;
        Ok(())
    }

    /// Number of distinct targets resolved so far
    pub fn resolved(&self) -> usize {
        self.resolutions.len()
    }

    /// Finish the walk and hand over the collected subtrees.
    pub fn finish(self) -> MergedTree {
        self.merged
    }
}

//! Viewer-driven hide/show of registered objects.
//!
//! Each frame the viewer position is mapped to a cell. When the cell changes,
//! the cell's invisible region is expanded from the asset and diffed against
//! the cells hidden so far: hidden cells outside the new region are queued to
//! be shown, region cells not yet hidden are queued to be hidden. Applying the
//! queues toggles the objects bound to those cells.

use glam::Vec3;
use hashbrown::HashSet;
use pvgrid_codec::VisibilityAsset;
use pvgrid_core::{Aabb, CellId, Frustum, Grid};

use crate::config::RuntimeConfig;
use crate::culling::CullingQuery;
use crate::occlusion_scene::OcclusionScene;
use crate::registry::{ObjectHandle, ObjectRegistry, Registration, VisibilitySink};

static EMPTY_SCENE: OcclusionScene = OcclusionScene::new();

/// Outcome of one [`RuntimeVisibilitySet::apply`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AppliedChanges {
    /// Cells newly hidden.
    pub hidden: usize,
    /// Cells newly shown.
    pub unhidden: usize,
}

impl AppliedChanges {
    pub const fn is_empty(&self) -> bool {
        self.hidden == 0 && self.unhidden == 0
    }
}

/// Outcome of one [`RuntimeVisibilitySet::tick`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Cell containing the viewer, if any.
    pub cell: Option<CellId>,
    pub cell_changed: bool,
    pub hidden: usize,
    pub unhidden: usize,
    pub occlusion_rebuilt: bool,
}

/// Debug snapshot of one cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellInfo {
    pub cell: CellId,
    pub hidden: bool,
    pub is_current: bool,
    pub single_objects: usize,
    pub multi_objects: usize,
    /// Runs stored for this cell in the asset.
    pub invisible_runs: usize,
}

/// State that only exists while a usable asset is loaded.
#[derive(Debug)]
struct ActiveGrid {
    asset: VisibilityAsset,
    grid: Grid,
    registry: ObjectRegistry,
    hidden: HashSet<CellId>,
    current: Option<CellId>,
    to_hide: Vec<CellId>,
    to_unhide: Vec<CellId>,
    occlusion: OcclusionScene,
    occlusion_dirty: bool,
}

impl ActiveGrid {
    fn new(asset: VisibilityAsset) -> Self {
        let grid = asset.grid();
        Self {
            registry: ObjectRegistry::new(asset.cell_count()),
            grid,
            asset,
            hidden: HashSet::new(),
            current: None,
            to_hide: Vec::new(),
            to_unhide: Vec::new(),
            occlusion: OcclusionScene::new(),
            occlusion_dirty: false,
        }
    }

    fn sorted_hidden(&self) -> Vec<CellId> {
        let mut cells: Vec<CellId> = self.hidden.iter().copied().collect();
        cells.sort_unstable();
        cells
    }

    fn queue_region(&mut self, cell: Option<CellId>) {
        let region: HashSet<CellId> = cell
            .map(|cell| self.asset.cell_data(cell).into_iter().collect())
            .unwrap_or_default();

        self.to_unhide = self
            .sorted_hidden()
            .into_iter()
            .filter(|c| !region.contains(c))
            .collect();

        let mut to_hide: Vec<CellId> = region
            .into_iter()
            .filter(|c| !self.hidden.contains(c))
            .collect();
        to_hide.sort_unstable();
        self.to_hide = to_hide;
    }
}

/// Hides and shows registered objects from the viewer's cell.
///
/// Built without an asset, or with an empty or malformed one, the set is
/// disabled: every operation is a no-op and every object stays visible.
#[derive(Debug)]
pub struct RuntimeVisibilitySet {
    config: RuntimeConfig,
    active: Option<ActiveGrid>,
}

impl RuntimeVisibilitySet {
    pub fn new(asset: Option<VisibilityAsset>, config: RuntimeConfig) -> Self {
        let active = match asset {
            None => {
                tracing::warn!("No visibility grid loaded, precomputed culling disabled");
                None
            }
            Some(asset) if asset.is_empty() => {
                tracing::warn!("Visibility grid has no cells, precomputed culling disabled");
                None
            }
            Some(asset) => match asset.validate() {
                Ok(()) => {
                    tracing::info!(
                        "Visibility grid {} ready ({} runs)",
                        asset.dims(),
                        asset.run_count()
                    );
                    Some(ActiveGrid::new(asset))
                }
                Err(e) => {
                    tracing::warn!("Rejected visibility grid ({e}), precomputed culling disabled");
                    None
                }
            },
        };
        Self { config, active }
    }

    #[inline]
    pub const fn is_enabled(&self) -> bool {
        self.active.is_some()
    }

    pub const fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn grid(&self) -> Option<&Grid> {
        self.active.as_ref().map(|a| &a.grid)
    }

    pub fn asset(&self) -> Option<&VisibilityAsset> {
        self.active.as_ref().map(|a| &a.asset)
    }

    /// Cell the viewer was last placed in.
    pub fn current_cell(&self) -> Option<CellId> {
        self.active.as_ref().and_then(|a| a.current)
    }

    /// Bind an object to the cells its bounds overlap.
    ///
    /// The object is hidden through `sink` right away when it only overlaps
    /// hidden cells. Registering a handle again replaces its binding and
    /// shows the object if the old binding hid it and the new one does not.
    /// Returns `None` when the set is disabled or the bounds miss the grid;
    /// such objects are never hidden.
    pub fn register<S: VisibilitySink + ?Sized>(
        &mut self,
        handle: ObjectHandle,
        bounds: &Aabb,
        sink: &mut S,
    ) -> Option<Registration> {
        let was_hidden = self.is_object_hidden(handle);
        let active = self.active.as_mut()?;
        let Some((min, max)) = active.grid.cell_range(bounds) else {
            active.registry.remove(handle);
            if was_hidden {
                sink.set_visible(handle, true);
            }
            tracing::trace!("Object {handle} lies outside the visibility grid");
            return None;
        };

        let cells = active.grid.cells_in_range(min, max);
        let (registration, hidden) = if let [cell] = cells[..] {
            let hidden = active.hidden.contains(&cell);
            (active.registry.insert_single(handle, cell), hidden)
        } else {
            let shown = cells.iter().filter(|c| !active.hidden.contains(*c)).count() as u32;
            (active.registry.insert_multi(handle, cells, shown), shown == 0)
        };
        if hidden {
            sink.set_visible(handle, false);
        } else if was_hidden {
            sink.set_visible(handle, true);
        }
        Some(registration)
    }

    /// Forget an object. It keeps whatever visibility it was last given.
    pub fn unregister(&mut self, handle: ObjectHandle) -> Option<Registration> {
        self.active.as_mut()?.registry.remove(handle)
    }

    /// Move the viewer to `cell` and queue the resulting hide/show work.
    ///
    /// A cell outside the grid, or `None`, has an empty invisible region, so
    /// every hidden cell gets queued to be shown. Returns `true` when the
    /// current cell changed.
    #[cfg_attr(
        feature = "profiling-tracy",
        tracing::instrument(level = "trace", skip_all)
    )]
    pub fn set_viewer_cell(&mut self, cell: Option<CellId>) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        let cell = cell.filter(|&c| active.grid.dims().contains_id(c));
        if cell == active.current {
            return false;
        }

        active.current = cell;
        active.queue_region(cell);
        tracing::debug!(
            "Viewer cell {:?}: {} cells to hide, {} to show",
            cell,
            active.to_hide.len(),
            active.to_unhide.len()
        );
        true
    }

    /// Drain the queues: show first, then hide.
    #[cfg_attr(
        feature = "profiling-tracy",
        tracing::instrument(level = "trace", skip_all)
    )]
    pub fn apply<S: VisibilitySink + ?Sized>(&mut self, sink: &mut S) -> AppliedChanges {
        let Some(active) = self.active.as_mut() else {
            return AppliedChanges::default();
        };
        let mut changes = AppliedChanges::default();

        for cell in std::mem::take(&mut active.to_unhide) {
            if active.hidden.remove(&cell) {
                active.registry.cell_shown(cell, sink);
                changes.unhidden += 1;
            }
        }
        for cell in std::mem::take(&mut active.to_hide) {
            if active.hidden.insert(cell) {
                active.registry.cell_hidden(cell, sink);
                changes.hidden += 1;
            }
        }

        if !changes.is_empty() {
            active.occlusion_dirty = true;
            tracing::trace!(
                "Applied visibility: {} hidden, {} shown, {} hidden in total",
                changes.hidden,
                changes.unhidden,
                active.hidden.len()
            );
        }
        changes
    }

    /// Rebuild the occlusion scene if the hidden set changed since the last
    /// rebuild. Returns `true` when a rebuild happened.
    pub fn refresh_occlusion_scene(&mut self) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        if !active.occlusion_dirty {
            return false;
        }
        let hidden = active.sorted_hidden();
        active.occlusion.rebuild(
            &active.grid,
            &hidden,
            self.config.growth_mode,
            self.config.occlusion_margin_ratio,
        );
        active.occlusion_dirty = false;
        true
    }

    /// Per-frame update from the viewer position.
    #[cfg_attr(
        feature = "profiling-tracy",
        tracing::instrument(level = "trace", skip_all)
    )]
    pub fn tick<S: VisibilitySink + ?Sized>(&mut self, viewer: Vec3, sink: &mut S) -> TickReport {
        let Some(cell) = self.active.as_ref().map(|a| a.grid.cell_at(viewer)) else {
            return TickReport::default();
        };

        let cell_changed = self.set_viewer_cell(cell);
        let applied = self.apply(sink);
        let occlusion_rebuilt = self.config.build_occlusion_scene && self.refresh_occlusion_scene();

        TickReport {
            cell,
            cell_changed,
            hidden: applied.hidden,
            unhidden: applied.unhidden,
            occlusion_rebuilt,
        }
    }

    /// Returns `false` for cells outside the grid and when disabled.
    pub fn is_cell_hidden(&self, cell: CellId) -> bool {
        self.active
            .as_ref()
            .is_some_and(|a| a.hidden.contains(&cell))
    }

    pub fn is_object_hidden(&self, handle: ObjectHandle) -> bool {
        let Some(active) = self.active.as_ref() else {
            return false;
        };
        match active.registry.get(handle) {
            Some(Registration::Single(cell)) => active.hidden.contains(&cell),
            Some(Registration::Multi(index)) => active
                .registry
                .multi(index)
                .is_some_and(|entry| entry.is_hidden()),
            None => false,
        }
    }

    /// Shown-cell counter of a multi-cell object.
    pub fn multi_cell_counter(&self, handle: ObjectHandle) -> Option<u32> {
        let active = self.active.as_ref()?;
        match active.registry.get(handle)? {
            Registration::Multi(index) => active.registry.multi(index).map(|e| e.counter),
            Registration::Single(_) => None,
        }
    }

    /// Hidden cells, ascending.
    pub fn hidden_cells(&self) -> Vec<CellId> {
        self.active
            .as_ref()
            .map(ActiveGrid::sorted_hidden)
            .unwrap_or_default()
    }

    pub fn queued_hides(&self) -> &[CellId] {
        self.active
            .as_ref()
            .map(|a| a.to_hide.as_slice())
            .unwrap_or_default()
    }

    pub fn queued_unhides(&self) -> &[CellId] {
        self.active
            .as_ref()
            .map(|a| a.to_unhide.as_slice())
            .unwrap_or_default()
    }

    pub fn cell_info(&self, cell: CellId) -> Option<CellInfo> {
        let active = self.active.as_ref()?;
        let objects = active.registry.cell(cell)?;
        Some(CellInfo {
            cell,
            hidden: active.hidden.contains(&cell),
            is_current: active.current == Some(cell),
            single_objects: objects.singles.len(),
            multi_objects: objects.multis.len(),
            invisible_runs: active.asset.cell_runs(cell).len(),
        })
    }

    /// Boxes covering the hidden cells as of the last rebuild.
    pub fn occlusion_scene(&self) -> &OcclusionScene {
        self.active.as_ref().map_or(&EMPTY_SCENE, |a| &a.occlusion)
    }

    pub fn culling_query(&self, frustum: Frustum) -> CullingQuery<'_> {
        CullingQuery::new(frustum, self.occlusion_scene())
    }
}

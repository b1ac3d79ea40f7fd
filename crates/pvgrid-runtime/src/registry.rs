//! Object bindings to grid cells.
//!
//! Objects inside one cell are toggled directly with that cell. Objects
//! spanning several cells share a [`MultiCellRef`] whose counter tracks how
//! many of the spanned cells are currently shown; the object is hidden only
//! while that counter is zero.

use hashbrown::HashMap;
use pvgrid_core::CellId;

/// Opaque identifier of a registered object, chosen by the caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectHandle(pub u64);

impl std::fmt::Display for ObjectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Receives hide/show decisions for registered objects.
pub trait VisibilitySink {
    fn set_visible(&mut self, handle: ObjectHandle, visible: bool);
}

impl<F: FnMut(ObjectHandle, bool)> VisibilitySink for F {
    fn set_visible(&mut self, handle: ObjectHandle, visible: bool) {
        self(handle, visible);
    }
}

/// Slot of a multi-cell object in the registry arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MultiCellIndex(pub u32);

impl MultiCellIndex {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// How an object is bound to the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Registration {
    /// Inside exactly one cell.
    Single(CellId),
    /// Spans several cells.
    Multi(MultiCellIndex),
}

/// Shared state of an object spanning several cells.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MultiCellRef {
    pub handle: ObjectHandle,
    /// Cells the object overlaps, ascending.
    pub spanned: Vec<CellId>,
    /// Spanned cells currently shown.
    pub counter: u32,
}

impl MultiCellRef {
    #[inline]
    pub const fn is_hidden(&self) -> bool {
        self.counter == 0
    }

    /// One spanned cell was hidden. Returns `true` when the object becomes hidden.
    pub fn cell_hidden(&mut self) -> bool {
        if self.counter == 0 {
            return false;
        }
        self.counter -= 1;
        self.counter == 0
    }

    /// One spanned cell was shown. Returns `true` when the object becomes visible.
    pub fn cell_shown(&mut self) -> bool {
        let was_hidden = self.counter == 0;
        self.counter = (self.counter + 1).min(self.spanned.len() as u32);
        was_hidden && self.counter > 0
    }
}

/// Objects bound to one cell.
#[derive(Clone, Debug, Default)]
pub struct CellObjects {
    pub singles: Vec<ObjectHandle>,
    pub multis: Vec<MultiCellIndex>,
}

impl CellObjects {
    pub fn is_empty(&self) -> bool {
        self.singles.is_empty() && self.multis.is_empty()
    }
}

/// Per-cell object lists plus the multi-cell arena.
#[derive(Clone, Debug, Default)]
pub struct ObjectRegistry {
    cells: Vec<CellObjects>,
    multis: Vec<Option<MultiCellRef>>,
    free: Vec<MultiCellIndex>,
    handles: HashMap<ObjectHandle, Registration>,
}

impl ObjectRegistry {
    pub fn new(cell_count: usize) -> Self {
        Self {
            cells: vec![CellObjects::default(); cell_count],
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn get(&self, handle: ObjectHandle) -> Option<Registration> {
        self.handles.get(&handle).copied()
    }

    /// Objects bound to `cell`, or `None` outside the grid.
    pub fn cell(&self, cell: CellId) -> Option<&CellObjects> {
        self.cells.get(cell.index())
    }

    pub fn multi(&self, index: MultiCellIndex) -> Option<&MultiCellRef> {
        self.multis.get(index.index()).and_then(Option::as_ref)
    }

    pub fn multi_mut(&mut self, index: MultiCellIndex) -> Option<&mut MultiCellRef> {
        self.multis.get_mut(index.index()).and_then(Option::as_mut)
    }

    /// Bind `handle` to a single cell, replacing any earlier binding.
    pub fn insert_single(&mut self, handle: ObjectHandle, cell: CellId) -> Registration {
        self.remove(handle);
        if let Some(objects) = self.cells.get_mut(cell.index()) {
            objects.singles.push(handle);
        }
        let registration = Registration::Single(cell);
        self.handles.insert(handle, registration);
        registration
    }

    /// Bind `handle` to every cell in `spanned`, replacing any earlier binding.
    pub fn insert_multi(
        &mut self,
        handle: ObjectHandle,
        spanned: Vec<CellId>,
        counter: u32,
    ) -> Registration {
        self.remove(handle);
        let entry = MultiCellRef {
            handle,
            counter: counter.min(spanned.len() as u32),
            spanned,
        };

        let index = if let Some(index) = self.free.pop() {
            index
        } else {
            self.multis.push(None);
            MultiCellIndex((self.multis.len() - 1) as u32)
        };
        for cell in &entry.spanned {
            if let Some(objects) = self.cells.get_mut(cell.index()) {
                objects.multis.push(index);
            }
        }
        self.multis[index.index()] = Some(entry);

        let registration = Registration::Multi(index);
        self.handles.insert(handle, registration);
        registration
    }

    /// A cell was hidden: hide its single-cell objects and count down its
    /// multi-cell objects. Returns the number of objects hidden.
    pub fn cell_hidden<S: VisibilitySink + ?Sized>(&mut self, cell: CellId, sink: &mut S) -> usize {
        let Some(objects) = self.cells.get(cell.index()) else {
            return 0;
        };
        let mut changed = 0;
        for &handle in &objects.singles {
            sink.set_visible(handle, false);
            changed += 1;
        }
        for index in &objects.multis {
            if let Some(entry) = self.multis.get_mut(index.index()).and_then(Option::as_mut) {
                if entry.cell_hidden() {
                    sink.set_visible(entry.handle, false);
                    changed += 1;
                }
            }
        }
        changed
    }

    /// A cell was shown: show its single-cell objects and count up its
    /// multi-cell objects. Returns the number of objects shown.
    pub fn cell_shown<S: VisibilitySink + ?Sized>(&mut self, cell: CellId, sink: &mut S) -> usize {
        let Some(objects) = self.cells.get(cell.index()) else {
            return 0;
        };
        let mut changed = 0;
        for &handle in &objects.singles {
            sink.set_visible(handle, true);
            changed += 1;
        }
        for index in &objects.multis {
            if let Some(entry) = self.multis.get_mut(index.index()).and_then(Option::as_mut) {
                if entry.cell_shown() {
                    sink.set_visible(entry.handle, true);
                    changed += 1;
                }
            }
        }
        changed
    }

    /// Drop the binding of `handle`.
    pub fn remove(&mut self, handle: ObjectHandle) -> Option<Registration> {
        let registration = self.handles.remove(&handle)?;
        match registration {
            Registration::Single(cell) => {
                if let Some(objects) = self.cells.get_mut(cell.index()) {
                    objects.singles.retain(|&h| h != handle);
                }
            }
            Registration::Multi(index) => {
                if let Some(entry) = self.multis.get_mut(index.index()).and_then(Option::take) {
                    for cell in entry.spanned {
                        if let Some(objects) = self.cells.get_mut(cell.index()) {
                            objects.multis.retain(|&i| i != index);
                        }
                    }
                    self.free.push(index);
                }
            }
        }
        Some(registration)
    }
}

//! Closed set of objects a container can own.

use std::fmt;

use gd_core::ObjectId;
use gd_model::{ComponentKind, GridComponent};

use crate::area::Area;

/// Child collection an object lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Category {
    Terminal,
    Area,
    Monitor,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Category::Terminal => "terminal",
            Category::Area => "area",
            Category::Monitor => "monitor",
        })
    }
}

/// An object handed to or taken from a container.
#[derive(Debug)]
pub enum GridObject {
    /// Buses, links and other components attached to the network.
    Terminal(Box<dyn GridComponent>),
    Area(Box<Area>),
    /// Relays and other observers of the network.
    Monitor(Box<dyn GridComponent>),
}

impl GridObject {
    pub fn terminal(component: impl GridComponent + 'static) -> Self {
        GridObject::Terminal(Box::new(component))
    }

    pub fn monitor(component: impl GridComponent + 'static) -> Self {
        GridObject::Monitor(Box::new(component))
    }

    pub fn area(area: Area) -> Self {
        GridObject::Area(Box::new(area))
    }

    /// Relays become monitors, everything else a terminal.
    pub fn from_component(component: Box<dyn GridComponent>) -> Self {
        match component.kind() {
            ComponentKind::Relay => GridObject::Monitor(component),
            _ => GridObject::Terminal(component),
        }
    }

    pub fn category(&self) -> Category {
        match self {
            GridObject::Terminal(_) => Category::Terminal,
            GridObject::Area(_) => Category::Area,
            GridObject::Monitor(_) => Category::Monitor,
        }
    }

    pub fn component(&self) -> &dyn GridComponent {
        match self {
            GridObject::Terminal(c) | GridObject::Monitor(c) => c.as_ref(),
            GridObject::Area(a) => a.as_ref(),
        }
    }

    pub fn component_mut(&mut self) -> &mut dyn GridComponent {
        match self {
            GridObject::Terminal(c) | GridObject::Monitor(c) => c.as_mut(),
            GridObject::Area(a) => a.as_mut(),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.component().id()
    }

    pub fn name(&self) -> &str {
        self.component().name()
    }

    pub fn as_area(&self) -> Option<&Area> {
        match self {
            GridObject::Area(a) => Some(a),
            _ => None,
        }
    }

    pub fn into_area(self) -> Option<Area> {
        match self {
            GridObject::Area(a) => Some(*a),
            _ => None,
        }
    }

    /// Whether a component of this kind may live in this category.
    pub(crate) fn accepts(category: Category, kind: ComponentKind) -> bool {
        match category {
            Category::Terminal => matches!(
                kind,
                ComponentKind::Bus | ComponentKind::Link | ComponentKind::Submodel
            ),
            Category::Monitor => matches!(kind, ComponentKind::Relay | ComponentKind::Submodel),
            Category::Area => kind == ComponentKind::Area,
        }
    }
}

impl From<Area> for GridObject {
    fn from(area: Area) -> Self {
        GridObject::area(area)
    }
}

use crate::error::{Result, ScanError};
use std::fmt;

/// An option chosen at one cascade step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub id: String,
    pub name: String,
}

/// The partially resolved device → brand → series → module path of a lineage.
///
/// Fields fill strictly left to right and are never overwritten; each setter
/// consumes the selection and returns the grown one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeSelection {
    device_id: String,
    brand: Option<Choice>,
    series: Option<Choice>,
    module_id: Option<String>,
}

impl CascadeSelection {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            brand: None,
            series: None,
            module_id: None,
        }
    }

    pub fn with_brand(mut self, id: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        if self.brand.is_some() {
            return Err(ScanError::CascadeOrder("brand"));
        }
        self.brand = Some(Choice {
            id: id.into(),
            name: name.into(),
        });
        Ok(self)
    }

    pub fn with_series(mut self, id: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        if self.brand.is_none() || self.series.is_some() {
            return Err(ScanError::CascadeOrder("series"));
        }
        self.series = Some(Choice {
            id: id.into(),
            name: name.into(),
        });
        Ok(self)
    }

    pub fn with_module(mut self, id: impl Into<String>) -> Result<Self> {
        if self.series.is_none() || self.module_id.is_some() {
            return Err(ScanError::CascadeOrder("module"));
        }
        self.module_id = Some(id.into());
        Ok(self)
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn brand(&self) -> Option<&Choice> {
        self.brand.as_ref()
    }

    pub fn series(&self) -> Option<&Choice> {
        self.series.as_ref()
    }

    pub fn module_id(&self) -> Option<&str> {
        self.module_id.as_deref()
    }
}

impl fmt::Display for CascadeSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "device {}", self.device_id)?;
        if let Some(brand) = &self.brand {
            write!(f, " / {} ({})", brand.name, brand.id)?;
        }
        if let Some(series) = &self.series {
            write!(f, " / {} ({})", series.name, series.id)?;
        }
        if let Some(module_id) = &self.module_id {
            write!(f, " / module {}", module_id)?;
        }
        Ok(())
    }
}

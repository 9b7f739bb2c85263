//! In-memory package registry
//!
//! An explicit object handed down the service call chain. Entries live
//! for the process lifetime; nothing is persisted here.

use std::collections::HashMap;

use crate::domain::package::Package;
use crate::domain::repository::PackageRepository;

#[derive(Debug, Default)]
pub struct PackageRegistry {
    packages: HashMap<String, Package>,
}

impl PackageRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PackageRepository for PackageRegistry {
    fn get(&self, name: &str) -> Option<&Package> {
        self.packages.get(name)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut Package> {
        self.packages.get_mut(name)
    }

    fn upsert(&mut self, package: Package) {
        self.packages.insert(package.name.clone(), package);
    }
}

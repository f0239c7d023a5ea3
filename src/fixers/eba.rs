//! EBA policy: packages are conformant by construction, so every variant
//! operation is a documented identity operation.

use crate::package::Package;
use crate::pipeline::{step, PackageFixer};
use crate::provider::Provider;
use crate::report::{Reporter, StepOutcome};
use anyhow::Result;

pub struct EbaFixer;

impl PackageFixer for EbaFixer {
    fn provider(&self) -> Provider {
        Provider::Eba
    }

    fn restructure(&self, _pkg: &Package, reporter: &mut dyn Reporter) -> Result<()> {
        reporter.step(step::RESTRUCTURE, StepOutcome::NoOp, "layout is conformant");
        Ok(())
    }

    fn regenerate_catalog(&self, _pkg: &Package, reporter: &mut dyn Reporter) -> Result<()> {
        reporter.step(
            step::REGENERATE_CATALOG,
            StepOutcome::NoOp,
            "catalog.xml kept as published",
        );
        Ok(())
    }

    fn regenerate_package_xml(&self, _pkg: &Package, reporter: &mut dyn Reporter) -> Result<()> {
        reporter.step(
            step::REGENERATE_PACKAGE_XML,
            StepOutcome::NoOp,
            "taxonomyPackage.xml kept as published",
        );
        Ok(())
    }
}

//! The repair pipeline: a fixed sequence of steps driven by the
//! inspection report and a provider-specific [`PackageFixer`].
//!
//! Steps run in a fixed order. The structural repairs are gated on the
//! inspection report so a defect that is absent is skipped rather than
//! re-applied. The working directory is cleaned up on every exit path,
//! including step failure.

use crate::descriptors::META_INF_DIR;
use crate::inspect::InspectionReport;
use crate::package::{move_children, Package};
use crate::provider::Provider;
use crate::report::{Reporter, StepOutcome};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Step names shared by fixers, reports, and tests.
pub mod step {
    pub const NORMALIZE_ZIP: &str = "normalize zip";
    pub const FIX_META_INF: &str = "fix META-INF";
    pub const FIX_TOP_LEVEL_DIR: &str = "fix top-level directory";
    pub const RESTRUCTURE: &str = "restructure";
    pub const REGENERATE_CATALOG: &str = "regenerate catalog.xml";
    pub const REGENERATE_PACKAGE_XML: &str = "regenerate taxonomyPackage.xml";
    pub const REPACKAGE: &str = "repackage";
}

/// Publisher-specific repair policy. The structural steps have default
/// implementations shared by every provider; restructuring and descriptor
/// regeneration are where providers differ.
pub trait PackageFixer {
    fn provider(&self) -> Provider;

    /// The source is not a zip container. Nothing needs to move on disk:
    /// the raw payload was copied into the working directory at extraction
    /// time, and repackaging produces the container.
    fn normalize_zip(&self, _pkg: &Package, reporter: &mut dyn Reporter) -> Result<()> {
        reporter.step(
            step::NORMALIZE_ZIP,
            StepOutcome::Applied,
            "raw input will be packaged as zip",
        );
        Ok(())
    }

    /// Create an empty `META-INF` directory at the package root so later
    /// steps have a place to regenerate the descriptors into.
    fn fix_meta_inf(&self, pkg: &Package, reporter: &mut dyn Reporter) -> Result<()> {
        let meta_inf = pkg.root()?.join(META_INF_DIR);
        fs::create_dir_all(&meta_inf)
            .with_context(|| format!("create {}", meta_inf.display()))?;
        reporter.step(step::FIX_META_INF, StepOutcome::Applied, "META-INF created");
        Ok(())
    }

    /// Synthesize the single top-level directory by moving every child of
    /// the working directory into a directory named after the archive.
    fn fix_top_level_dir(&self, pkg: &Package, reporter: &mut dyn Reporter) -> Result<()> {
        let top = pkg.work_dir().join(pkg.name());
        move_children(pkg.work_dir(), &top, &[pkg.name()])?;
        reporter.step(
            step::FIX_TOP_LEVEL_DIR,
            StepOutcome::Applied,
            &format!("content moved under {}/", pkg.name()),
        );
        Ok(())
    }

    fn restructure(&self, pkg: &Package, reporter: &mut dyn Reporter) -> Result<()>;

    fn regenerate_catalog(&self, pkg: &Package, reporter: &mut dyn Reporter) -> Result<()>;

    fn regenerate_package_xml(&self, pkg: &Package, reporter: &mut dyn Reporter) -> Result<()>;

    fn repackage(&self, pkg: &Package, dest: &Path, reporter: &mut dyn Reporter) -> Result<()> {
        pkg.repackage(dest)?;
        reporter.step(
            step::REPACKAGE,
            StepOutcome::Applied,
            &format!("wrote {}", dest.display()),
        );
        Ok(())
    }
}

/// Run the full pipeline over an extracted package. The working directory
/// is removed whether the steps succeed or fail; a step error takes
/// precedence over a cleanup error.
pub fn run_pipeline(
    fixer: &dyn PackageFixer,
    pkg: &Package,
    report: &InspectionReport,
    dest: &Path,
    reporter: &mut dyn Reporter,
) -> Result<()> {
    let outcome = run_steps(fixer, pkg, report, dest, reporter);
    outcome.and(pkg.cleanup())
}

fn run_steps(
    fixer: &dyn PackageFixer,
    pkg: &Package,
    report: &InspectionReport,
    dest: &Path,
    reporter: &mut dyn Reporter,
) -> Result<()> {
    if report.is_zip {
        reporter.step(step::NORMALIZE_ZIP, StepOutcome::Skipped, "");
    } else {
        fixer.normalize_zip(pkg, reporter)?;
    }
    if report.has_complete_meta_inf() {
        reporter.step(step::FIX_META_INF, StepOutcome::Skipped, "");
    } else {
        fixer.fix_meta_inf(pkg, reporter)?;
    }
    if report.has_single_top_level_dir {
        reporter.step(step::FIX_TOP_LEVEL_DIR, StepOutcome::Skipped, "");
    } else {
        fixer.fix_top_level_dir(pkg, reporter)?;
    }
    fixer.restructure(pkg, reporter)?;
    fixer.regenerate_catalog(pkg, reporter)?;
    fixer.regenerate_package_xml(pkg, reporter)?;
    fixer.repackage(pkg, dest, reporter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect;
    use crate::report::RecordingReporter;
    use anyhow::bail;
    use std::fs::File;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    struct FailingFixer;

    impl PackageFixer for FailingFixer {
        fn provider(&self) -> Provider {
            Provider::Eba
        }

        fn restructure(&self, _pkg: &Package, _reporter: &mut dyn Reporter) -> Result<()> {
            bail!("restructure exploded")
        }

        fn regenerate_catalog(&self, _pkg: &Package, _reporter: &mut dyn Reporter) -> Result<()> {
            Ok(())
        }

        fn regenerate_package_xml(
            &self,
            _pkg: &Package,
            _reporter: &mut dyn Reporter,
        ) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn step_failure_propagates_and_workdir_is_removed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("pkg.zip");
        let file = File::create(&source).unwrap();
        let mut writer = ZipWriter::new(file);
        writer
            .start_file("pkg/a.txt", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"a").unwrap();
        writer.finish().unwrap();

        let work_dir = dir.path().join("pkg.work");
        let pkg = Package::extract(&source, &work_dir).unwrap();
        let report = inspect::inspect(&source).unwrap();
        let dest = dir.path().join("out/pkg.zip");
        let mut reporter = RecordingReporter::default();

        let result = run_pipeline(&FailingFixer, &pkg, &report, &dest, &mut reporter);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("restructure exploded"));
        assert!(!work_dir.exists());
        assert!(!dest.exists());
    }
}

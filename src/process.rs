//! Output planning and image transformation.
//!
//! Takes the resolved images from the cascade and writes every output file.
//! The stage runs in two passes:
//!
//! 1. **Plan**: for every image that is not ignored, every targeted
//!    destination, and every output name, compute the final path. Two planned
//!    writes to the same path are a configuration error and abort the run
//!    before any pixel work starts.
//! 2. **Transform**: load each source once, normalize its pixel mode, render
//!    it per destination (see [`render`]), create the destination directory,
//!    and save one file per output name.
//!
//! ## Output Structure
//!
//! ```text
//! graphics/                          # graphics_folder
//! ├── logos/england/                 # destination "logos/{folder}", folder = "england"
//! │   ├── 1.png                      # save_as = "1"
//! │   └── gunners.png                # duplicates = ["gunners"]
//! └── faces/england/
//!     ├── 1.png
//!     └── gunners.png
//! ```
//!
//! ## Parallel Processing
//!
//! Images are processed in parallel using [rayon](https://docs.rs/rayon). The
//! rule index, destination specs, and preloaded masks are shared read-only;
//! directory creation is idempotent, and collisions were ruled out by the plan.

use crate::destination::Destinations;
use crate::imaging::{
    BackendError, CropAnchor, ImageBackend, OperationError, PixelMode, RustBackend, render,
};
use crate::naming::{normalize_path, output_file_name};
use crate::resolve::{ResolveError, ResolvedImage, resolve_all};
use crate::scan::{ScanError, scan};
use crate::settings::{ErrorPolicy, Settings};
use crate::types::{DestinationId, ImageSource};
use image::DynamicImage;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("Image I/O failed: {0}")]
    Backend(#[from] BackendError),
    #[error("Processing {path} failed: {source}")]
    Operation {
        path: PathBuf,
        #[source]
        source: OperationError,
    },
    #[error("Unknown destination '{0}'")]
    UnknownDestination(DestinationId),
    #[error("Mask for destination '{destination}' could not be loaded: {source}")]
    Mask {
        destination: DestinationId,
        #[source]
        source: BackendError,
    },
    #[error("Output {path} would be written by both {first} and {second}")]
    OutputCollision {
        path: PathBuf,
        first: PathBuf,
        second: PathBuf,
    },
}

/// Everything one destination receives from one image.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub destination: DestinationId,
    /// Concrete output directory (`{folder}` substituted).
    pub directory: PathBuf,
    /// One path per output name, sorted.
    pub files: Vec<PathBuf>,
}

/// One image that will be transformed.
#[derive(Debug, Clone)]
pub struct ImageJob {
    pub source: ImageSource,
    pub crop_anchor: CropAnchor,
    pub targets: Vec<Target>,
}

impl ImageJob {
    pub fn output_count(&self) -> usize {
        self.targets.iter().map(|t| t.files.len()).sum()
    }
}

/// Every write of a run, computed before any pixel work.
#[derive(Debug, Default)]
pub struct Plan {
    pub jobs: Vec<ImageJob>,
    /// Sources skipped because their effective config says `ignore`.
    pub ignored: Vec<PathBuf>,
}

impl Plan {
    pub fn output_count(&self) -> usize {
        self.jobs.iter().map(ImageJob::output_count).sum()
    }
}

/// Compute every output path and reject collisions.
pub fn plan_outputs(
    resolved: &[ResolvedImage],
    destinations: &Destinations,
) -> Result<Plan, ProcessError> {
    let mut plan = Plan::default();
    let mut claimed: HashMap<PathBuf, PathBuf> = HashMap::new();

    for ResolvedImage { source, config } in resolved {
        if config.ignore {
            debug!(image = %source.path.display(), "ignored");
            plan.ignored.push(source.path.clone());
            continue;
        }

        let mut targets = Vec::with_capacity(config.destinations.len());
        for id in &config.destinations {
            let spec = destinations
                .get(id)
                .ok_or_else(|| ProcessError::UnknownDestination(id.clone()))?;
            let directory = normalize_path(&spec.output_dir(&config.folder));
            let extension = spec.output_extension(&source.extension);

            let mut files = Vec::new();
            for name in config.output_names() {
                let path = directory.join(output_file_name(name, extension));
                if let Some(first) = claimed.insert(path.clone(), source.path.clone()) {
                    return Err(ProcessError::OutputCollision {
                        path,
                        first,
                        second: source.path.clone(),
                    });
                }
                debug!(image = %source.path.display(), output = %path.display(), "planned");
                files.push(path);
            }

            targets.push(Target {
                destination: id.clone(),
                directory,
                files,
            });
        }

        plan.jobs.push(ImageJob {
            source: source.clone(),
            crop_anchor: config.crop_anchor,
            targets,
        });
    }

    Ok(plan)
}

/// Mask images keyed by destination, loaded once per run.
pub type MaskCache = BTreeMap<DestinationId, DynamicImage>;

/// Load the mask of every destination the plan actually writes to.
pub fn load_masks(
    backend: &impl ImageBackend,
    plan: &Plan,
    destinations: &Destinations,
) -> Result<MaskCache, ProcessError> {
    let mut masks = MaskCache::new();
    for target in plan.jobs.iter().flat_map(|job| &job.targets) {
        if masks.contains_key(&target.destination) {
            continue;
        }
        let Some(mask) = destinations
            .get(&target.destination)
            .and_then(|spec| spec.mask.as_ref())
        else {
            continue;
        };
        let image = backend
            .load(&mask.image)
            .map_err(|source| ProcessError::Mask {
                destination: target.destination.clone(),
                source,
            })?;
        masks.insert(target.destination.clone(), image);
    }
    Ok(masks)
}

/// Render and write every output of one image.
///
/// Returns the written paths in plan order.
pub fn transform(
    backend: &impl ImageBackend,
    job: &ImageJob,
    destinations: &Destinations,
    masks: &MaskCache,
) -> Result<Vec<PathBuf>, ProcessError> {
    let mode = PixelMode::from_extension(&job.source.extension).unwrap_or(PixelMode::Rgba);
    let image = mode.convert(backend.load(&job.source.path)?);

    let mut written = Vec::with_capacity(job.output_count());
    for target in &job.targets {
        let spec = destinations
            .get(&target.destination)
            .ok_or_else(|| ProcessError::UnknownDestination(target.destination.clone()))?;

        let rendered = render(
            &image,
            mode,
            spec,
            job.crop_anchor,
            masks.get(&target.destination),
        )
        .map_err(|source| ProcessError::Operation {
            path: job.source.path.clone(),
            source,
        })?;

        backend.ensure_dir(&target.directory)?;
        for file in &target.files {
            backend.save(&rendered, file)?;
            written.push(file.clone());
        }
    }
    Ok(written)
}

/// Progress events sent while images are processed.
#[derive(Debug, Clone)]
pub enum ProcessEvent {
    ImageWritten {
        source: PathBuf,
        outputs: Vec<PathBuf>,
    },
    ImageFailed {
        source: PathBuf,
        error: String,
    },
}

/// A source image that could not be processed under [`ErrorPolicy::Continue`].
#[derive(Debug, Clone)]
pub struct ImageFailure {
    pub source: PathBuf,
    pub error: String,
}

/// Result of the transform pass.
#[derive(Debug, Default)]
pub struct ProcessResult {
    /// Written outputs per source image, in plan order.
    pub written: Vec<(PathBuf, Vec<PathBuf>)>,
    pub ignored: usize,
    pub failures: Vec<ImageFailure>,
}

impl ProcessResult {
    pub fn output_count(&self) -> usize {
        self.written.iter().map(|(_, outputs)| outputs.len()).sum()
    }
}

/// Scan, resolve, plan, and transform with the `image`-crate backend.
pub fn build(
    settings: &Settings,
    policy: ErrorPolicy,
    progress: Option<Sender<ProcessEvent>>,
) -> Result<ProcessResult, ProcessError> {
    build_with_backend(&RustBackend::new(), settings, policy, progress)
}

/// Full run using a specific backend (allows testing with mock).
pub fn build_with_backend(
    backend: &impl ImageBackend,
    settings: &Settings,
    policy: ErrorPolicy,
    progress: Option<Sender<ProcessEvent>>,
) -> Result<ProcessResult, ProcessError> {
    let plan = check(settings)?;
    process_with_backend(backend, &plan, &settings.destinations, policy, progress)
}

/// Scan, resolve, and plan without writing anything.
pub fn check(settings: &Settings) -> Result<Plan, ProcessError> {
    let scanned = scan(
        &settings.source_folder,
        &settings.rule_file_name,
        &settings.destinations,
    )?;
    info!(
        images = scanned.images.len(),
        rules = scanned.rules.rule_count(),
        "scanned {}",
        settings.source_folder.display()
    );

    let resolved = resolve_all(&scanned.rules, &scanned.images)?;
    let plan = plan_outputs(&resolved, &settings.destinations)?;
    info!(
        images = plan.jobs.len(),
        ignored = plan.ignored.len(),
        outputs = plan.output_count(),
        "planned outputs"
    );
    Ok(plan)
}

/// Transform every planned image.
pub fn process_with_backend(
    backend: &impl ImageBackend,
    plan: &Plan,
    destinations: &Destinations,
    policy: ErrorPolicy,
    progress: Option<Sender<ProcessEvent>>,
) -> Result<ProcessResult, ProcessError> {
    let masks = load_masks(backend, plan, destinations)?;

    let run_one = |tx: &mut Option<Sender<ProcessEvent>>, job: &ImageJob| {
        let outcome = transform(backend, job, destinations, &masks);
        if let Some(tx) = tx {
            let event = match &outcome {
                Ok(outputs) => ProcessEvent::ImageWritten {
                    source: job.source.path.clone(),
                    outputs: outputs.clone(),
                },
                Err(e) => ProcessEvent::ImageFailed {
                    source: job.source.path.clone(),
                    error: e.to_string(),
                },
            };
            tx.send(event).ok();
        }
        outcome.map(|outputs| (job.source.path.clone(), outputs))
    };

    let mut result = ProcessResult {
        ignored: plan.ignored.len(),
        ..Default::default()
    };

    match policy {
        ErrorPolicy::Abort => {
            result.written = plan
                .jobs
                .par_iter()
                .map_with(progress, run_one)
                .collect::<Result<Vec<_>, _>>()?;
        }
        ErrorPolicy::Continue => {
            let outcomes: Vec<_> = plan
                .jobs
                .par_iter()
                .map_with(progress, |tx, job| (job, run_one(tx, job)))
                .collect();
            for (job, outcome) in outcomes {
                match outcome {
                    Ok(written) => result.written.push(written),
                    Err(e) => {
                        warn!(image = %job.source.path.display(), error = %e, "skipping image");
                        result.failures.push(ImageFailure {
                            source: job.source.path.clone(),
                            error: e.to_string(),
                        });
                    }
                }
            }
        }
    }

    info!(
        written = result.output_count(),
        failed = result.failures.len(),
        "processing finished"
    );
    Ok(result)
}

/// Relative display form of `path` under `root`, falling back to the full path.
pub fn relative_to<'a>(path: &'a Path, root: &Path) -> &'a Path {
    path.strip_prefix(root).unwrap_or(path)
}

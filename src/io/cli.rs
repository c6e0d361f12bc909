//! Command-line interface: `gather`, `create` and `list`

use crate::algorithm::assembler::{AssembleOptions, Collage, assemble};
use crate::algorithm::gather::{GatherOptions, gather_folder};
use crate::algorithm::resolver::TileResolver;
use crate::analysis::descriptor::{ColorSpace, DescriptorConfig};
use crate::index::forest::IndexParams;
use crate::io::configuration::{
    DEFAULT_LEAF_SIZE, DEFAULT_SAMPLE_DIMENSION, DEFAULT_SEED, DEFAULT_TILE_HEIGHT,
    DEFAULT_TILE_WIDTH, DEFAULT_TREE_COUNT, INPUT_DIRECTORY, OUTPUT_DIRECTORY, OUTPUT_SUFFIX,
    PROFILES_DIRECTORY,
};
use crate::io::error::{Result, invalid_parameter};
use crate::io::image::{RasterFormat, load_rgb, save_rgb, supported_extensions};
use crate::io::progress::ProgressReporter;
use crate::io::store::ProfileStore;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "anncollage")]
#[command(
    author,
    version,
    about = "Build photographic collages from indexed image tiles"
)]
/// Command-line arguments shared by every subcommand
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,

    /// Folder holding stored profiles
    #[arg(long, global = true, default_value = PROFILES_DIRECTORY)]
    pub profiles: PathBuf,

    /// Suppress progress output and informational logging
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

impl Cli {
    /// Check if progress should be displayed
    pub const fn should_show_progress(&self) -> bool {
        !self.quiet
    }
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Cut source images into tiles and store them as a named profile
    Gather(GatherArgs),
    /// Rebuild a target image out of a stored profile's tiles
    Create(CreateArgs),
    /// Show every stored profile
    List,
}

/// Descriptor channels selectable on the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorArg {
    /// Luminance only
    Luma,
    /// Red, green and blue
    #[default]
    Rgb,
}

impl From<ColorArg> for ColorSpace {
    fn from(color: ColorArg) -> Self {
        match color {
            ColorArg::Luma => Self::Luma,
            ColorArg::Rgb => Self::Rgb,
        }
    }
}

/// Arguments of `gather`
#[derive(Args, Debug)]
pub struct GatherArgs {
    /// Name of the profile to create or replace
    #[arg(short, long)]
    pub name: String,

    /// Folder of source images
    #[arg(short, long, default_value = INPUT_DIRECTORY)]
    pub folder: PathBuf,

    /// Tile width in pixels
    #[arg(short = 'w', long, default_value_t = DEFAULT_TILE_WIDTH)]
    pub width: u32,

    /// Tile height in pixels
    #[arg(short = 'j', long, default_value_t = DEFAULT_TILE_HEIGHT)]
    pub height: u32,

    /// Distance between tile origins (defaults to the tile size)
    #[arg(short, long)]
    pub increment: Option<u32>,

    /// Blocks per side of the descriptor grid
    #[arg(short, long, default_value_t = DEFAULT_SAMPLE_DIMENSION)]
    pub sample: u32,

    /// Channels sampled by the descriptor
    #[arg(long, value_enum, default_value_t = ColorArg::Rgb)]
    pub color: ColorArg,

    /// Number of projection trees
    #[arg(long, default_value_t = DEFAULT_TREE_COUNT)]
    pub trees: usize,

    /// Maximum entries per tree leaf
    #[arg(long, default_value_t = DEFAULT_LEAF_SIZE)]
    pub leaf_size: usize,

    /// Seed for index construction
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Store tile pixels in the profile instead of referencing source images
    #[arg(long)]
    pub embed: bool,
}

impl GatherArgs {
    /// Pipeline options described by these arguments
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor or index parameters are invalid
    pub fn options(&self) -> Result<GatherOptions> {
        let descriptor =
            DescriptorConfig::new(self.width, self.height, self.sample, self.color.into())?;
        let index = IndexParams {
            tree_count: self.trees,
            leaf_size: self.leaf_size,
            seed: self.seed,
            search_k: None,
        };
        let mut options = GatherOptions::new(descriptor, index);
        if let Some(increment) = self.increment {
            options.stride_x = increment;
            options.stride_y = increment;
        }
        options.validate()?;
        Ok(options)
    }
}

/// Arguments of `create`
#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Target image to rebuild
    #[arg(short, long)]
    pub image: PathBuf,

    /// Profile supplying the tiles
    #[arg(short, long)]
    pub profile: String,

    /// Output file (defaults to `output/<target>_collage.png`)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of collage variations to write
    #[arg(short, long, default_value_t = 1)]
    pub count: usize,

    /// Target cell width (defaults to the profile's tile width)
    #[arg(short = 'w', long)]
    pub width: Option<u32>,

    /// Target cell height (defaults to the profile's tile height)
    #[arg(short = 'j', long)]
    pub height: Option<u32>,

    /// Use each profile tile at most once where possible
    #[arg(long)]
    pub no_repeat: bool,

    /// Candidates gathered per query (overrides the stored setting)
    #[arg(long)]
    pub search_k: Option<usize>,
}

impl CreateArgs {
    /// Output file of every variation, in order
    ///
    /// # Errors
    ///
    /// Returns an error if the count is zero or the output extension is not
    /// a supported raster format
    pub fn output_paths(&self) -> Result<Vec<PathBuf>> {
        if self.count == 0 {
            return Err(invalid_parameter(
                "count",
                &self.count,
                &"at least one collage must be requested",
            ));
        }
        let base = self
            .output
            .clone()
            .unwrap_or_else(|| default_output_path(&self.image));
        if RasterFormat::from_path(&base).is_none() {
            return Err(invalid_parameter(
                "output",
                &base.display(),
                &format!("unsupported raster format, expected one of {}", supported_extensions()),
            ));
        }
        if self.count == 1 {
            return Ok(vec![base]);
        }
        Ok((1..=self.count)
            .map(|version| numbered_path(&base, version))
            .collect())
    }
}

/// Default collage location for a target image
pub fn default_output_path(target: &Path) -> PathBuf {
    let stem = target.file_stem().unwrap_or_default().to_string_lossy();
    Path::new(OUTPUT_DIRECTORY).join(format!("{stem}{OUTPUT_SUFFIX}.png"))
}

/// `<stem>_<version>.<ext>` next to `base`
pub fn numbered_path(base: &Path, version: usize) -> PathBuf {
    let stem = base.file_stem().unwrap_or_default().to_string_lossy();
    let name = match base.extension() {
        Some(extension) => format!("{stem}_{version}.{}", extension.to_string_lossy()),
        None => format!("{stem}_{version}"),
    };
    base.with_file_name(name)
}

/// Runs one parsed command against a profile store
pub struct CommandRunner {
    cli: Cli,
    progress: ProgressReporter,
    store: ProfileStore,
}

impl CommandRunner {
    /// Create a runner for the given CLI arguments
    pub fn new(cli: Cli) -> Self {
        let progress = ProgressReporter::new(cli.should_show_progress());
        let store = ProfileStore::new(cli.profiles.clone());
        Self {
            cli,
            progress,
            store,
        }
    }

    /// Execute the command
    ///
    /// # Errors
    ///
    /// Returns the first fatal error of the command; no partial profile or
    /// collage is left behind
    pub fn run(&mut self) -> Result<()> {
        match &self.cli.command {
            Command::Gather(args) => Self::gather(&self.store, args, &mut self.progress),
            Command::Create(args) => Self::create(&self.store, args, &mut self.progress),
            Command::List => Self::list(&self.store),
        }
    }

    fn gather(
        store: &ProfileStore,
        args: &GatherArgs,
        progress: &mut ProgressReporter,
    ) -> Result<()> {
        let start_time = Instant::now();
        let options = args.options()?;
        let profile = gather_folder(&args.name, &args.folder, &options, progress)?;
        store.save(&profile, &args.name)?;
        log::info!(
            "Profile '{}' holds {} tiles from {} images ({:.1}s)",
            args.name,
            profile.tile_count(),
            profile.sources().len(),
            start_time.elapsed().as_secs_f32()
        );
        Ok(())
    }

    // Every variation is assembled before the first file is written, so a
    // failing cell leaves no output behind.
    fn create(
        store: &ProfileStore,
        args: &CreateArgs,
        progress: &mut ProgressReporter,
    ) -> Result<()> {
        let start_time = Instant::now();
        let outputs = args.output_paths()?;
        let mut profile = store.load(&args.profile)?;
        if let Some(search_k) = args.search_k {
            profile.index_mut().set_search_k(search_k)?;
        }
        let target = load_rgb(&args.image)?;

        let mut resolver = TileResolver::for_profile(&profile);
        let mut collages: Vec<Collage> = Vec::with_capacity(outputs.len());
        progress.start_stage("create", outputs.len());
        for (variation, output) in outputs.iter().enumerate() {
            progress.advance(&output.display().to_string());
            let options = AssembleOptions {
                cell_width: args.width,
                cell_height: args.height,
                variation,
                variation_count: outputs.len(),
                no_repeat: args.no_repeat,
            };
            collages.push(assemble(&target, &profile, &options, &mut resolver)?);
        }
        progress.finish_stage();

        for (collage, output) in collages.iter().zip(&outputs) {
            save_rgb(&collage.image, output)?;
            log::info!(
                "Wrote {} ({}x{} cells)",
                output.display(),
                collage.grid.0,
                collage.grid.1
            );
        }
        log::info!(
            "Created {} collage(s) in {:.1}s",
            outputs.len(),
            start_time.elapsed().as_secs_f32()
        );
        Ok(())
    }

    // Allow print for the listing itself, which is the command's output
    #[allow(clippy::print_stdout)]
    fn list(store: &ProfileStore) -> Result<()> {
        let summaries = store.summaries()?;
        if summaries.is_empty() {
            log::info!("No profiles in {}", store.root().display());
            return Ok(());
        }

        let name_width = summaries
            .iter()
            .map(|summary| summary.name.len())
            .max()
            .unwrap_or(0)
            .max("NAME".len());
        println!(
            "{:<name_width$}  {:>7}  {:>7}  {:>9}  COLOR",
            "NAME", "SOURCES", "TILES", "TILE SIZE"
        );
        for summary in &summaries {
            let tile_size = format!(
                "{}x{}",
                summary.descriptor.tile_width, summary.descriptor.tile_height
            );
            println!(
                "{:<name_width$}  {:>7}  {:>7}  {:>9}  {}",
                summary.name,
                summary.source_count,
                summary.tile_count,
                tile_size,
                summary.descriptor.color_space
            );
        }
        Ok(())
    }
}

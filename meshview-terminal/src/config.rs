use std::path::PathBuf;

use clap::Parser;
use meshview_core::{CullMode, ModelSource, NormalConvention, ProjectionMode, ViewerConfig};

/// CLI argument definition (clap derive).
#[derive(Parser, Debug)]
#[command(
    name = "meshview",
    about = "Interactive terminal viewer for STL meshes and volume iso-surfaces",
    version
)]
pub struct CliArgs {
    /// Model to open: an STL file, or an `.mvol` volume to extract a surface from
    pub input: Option<PathBuf>,

    /// Iso level for volume inputs
    #[arg(long, default_value_t = 0.5)]
    pub iso_level: f32,

    /// Resample volume inputs by this factor before extracting the surface
    #[arg(long)]
    pub scale: Option<f32>,

    /// Hide the X/Y/Z reference axes
    #[arg(long)]
    pub no_axes: bool,

    /// Skip triangles facing away from the camera
    #[arg(long)]
    pub cull_back: bool,

    /// Negate supplied normals (for inward-facing meshes)
    #[arg(long)]
    pub flip_normals: bool,

    /// Use a parallel projection instead of perspective
    #[arg(long)]
    pub orthographic: bool,

    /// Degrees per arrow key press
    #[arg(long, default_value_t = 15.0)]
    pub key_step: f32,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl CliArgs {
    /// The model named on the command line, if any.
    pub fn model_source(&self) -> Option<ModelSource> {
        self.input
            .as_ref()
            .map(|path| ModelSource::from_path(path, self.iso_level, self.scale))
    }

    pub fn projection(&self) -> ProjectionMode {
        if self.orthographic {
            ProjectionMode::Orthographic
        } else {
            ProjectionMode::Perspective
        }
    }
}

impl From<&CliArgs> for ViewerConfig {
    fn from(args: &CliArgs) -> Self {
        let mut config = ViewerConfig::default();
        config.interaction.key_step = args.key_step;
        config.show_axes = !args.no_axes;
        if args.cull_back {
            config.cull_mode = CullMode::Back;
        }
        if args.flip_normals {
            config.normals = NormalConvention::Flipped;
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_viewer_defaults() {
        let args = CliArgs::parse_from(["meshview"]);
        assert!(args.input.is_none());
        assert!(args.model_source().is_none());
        assert_eq!(ViewerConfig::from(&args), ViewerConfig::default());
        assert_eq!(args.projection(), ProjectionMode::Perspective);
    }

    #[test]
    fn flags_map_into_config() {
        let args = CliArgs::parse_from([
            "meshview",
            "part.stl",
            "--no-axes",
            "--cull-back",
            "--flip-normals",
            "--key-step",
            "5",
            "--orthographic",
        ]);
        assert_eq!(args.projection(), ProjectionMode::Orthographic);
        let config = ViewerConfig::from(&args);
        assert!(!config.show_axes);
        assert_eq!(config.cull_mode, CullMode::Back);
        assert_eq!(config.normals, NormalConvention::Flipped);
        assert_eq!(config.interaction.key_step, 5.0);
        assert_eq!(args.model_source(), Some(ModelSource::Stl("part.stl".into())));
    }

    #[test]
    fn volume_input_carries_iso_level_and_scale() {
        let args = CliArgs::parse_from(["meshview", "head.mvol", "--iso-level", "80", "--scale", "0.5"]);
        assert_eq!(
            args.model_source(),
            Some(ModelSource::IsoSurface {
                volume: "head.mvol".into(),
                iso_level: 80.0,
                scale: Some(0.5),
            })
        );
    }
}

//! Headless front end for `bvhkit`: inspect BVH files, dump poses, and apply edits.
//!
//! # Commands
//!
//! - `bvhkit info <file>` - skeleton, channel and timing summary
//! - `bvhkit pose <file>` - forward kinematics of one frame as JSON
//! - `bvhkit insert <file>` - hold a frame for extra frames
//! - `bvhkit lerp <file>` - interpolate between keyframes
//! - `bvhkit drag <file>` - rotate or solve IK for one or more drag samples
//! - `bvhkit play <file>` - run the playback clock and print the frames it visits
//!
//! Set `RUST_LOG=debug` for parser and solver diagnostics.

use anyhow::{Context, Result, bail};
use bvhkit::glam::{DMat4, DVec3};
use bvhkit::{
    AxisMask, DEFAULT_TICK_MS, IkSolver, MotionDocument, MoveMode, Playback, Pose, SolveOutcome,
    SolverSettings,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "bvhkit")]
#[command(about = "Inspect and edit BVH motion capture files", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the skeleton, channel layout and timing
    Info {
        file: PathBuf,
    },

    /// Dump global joint positions of one frame as JSON
    Pose {
        file: PathBuf,

        #[arg(long, default_value_t = 0)]
        frame: usize,

        /// Multiplier for offsets and root translation
        #[arg(long, default_value_t = 1.0)]
        scale: f64,

        /// Apply the viewer's centering offset as the model transform
        #[arg(long)]
        center: bool,

        /// Include bone segments
        #[arg(long)]
        segments: bool,
    },

    /// Insert held copies of a frame after it
    Insert {
        file: PathBuf,

        #[arg(long)]
        frame: usize,

        #[arg(long, default_value_t = 1)]
        count: usize,

        /// Interpolate across keyframes after inserting
        #[arg(long)]
        lerp: bool,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Mark keyframes and linearly interpolate every channel between them
    Lerp {
        file: PathBuf,

        /// Comma separated frame indices
        #[arg(long, value_delimiter = ',', required = true)]
        keyframes: Vec<usize>,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Apply drag samples to joints of one frame
    Drag(DragArgs),

    /// Run the playback clock and print each frame it lands on
    Play {
        file: PathBuf,

        /// Wall time to simulate in milliseconds
        #[arg(long, default_value_t = 1000.0)]
        duration: f64,

        /// Speed multiplier; negative plays backwards
        #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
        speed: f64,
    },
}

#[derive(Args)]
struct DragArgs {
    file: PathBuf,

    #[arg(long, default_value_t = 0)]
    frame: usize,

    /// Joint name or index; repeat for multi-target drags
    #[arg(long = "joint", required = true)]
    joints: Vec<String>,

    /// Displacement per sample as x,y,z
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    delta: Vec<f64>,

    /// Number of drag samples; the pose is re-evaluated between samples
    #[arg(long, default_value_t = 1)]
    samples: usize,

    #[arg(long, default_value_t = 1.0)]
    scale: f64,

    /// Solver settings as JSON; flags below override individual fields
    #[arg(long)]
    settings: Option<PathBuf>,

    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Enable damping with this lambda
    #[arg(long)]
    lambda: Option<f64>,

    /// Enable the null-space control term with these x,y,z gains
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    gains: Option<Vec<f64>>,

    /// Axes the displacement may use, e.g. `xz`
    #[arg(long)]
    axes: Option<String>,

    /// Do not clamp targets to the chain reach
    #[arg(long)]
    no_clamp: bool,

    #[arg(short, long)]
    output: PathBuf,
}

#[derive(Copy, Clone, ValueEnum)]
enum Mode {
    Rotate,
    Ik,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Info { file } => info(&file),
        Commands::Pose {
            file,
            frame,
            scale,
            center,
            segments,
        } => pose(&file, frame, scale, center, segments),
        Commands::Insert {
            file,
            frame,
            count,
            lerp,
            output,
        } => {
            let mut doc = open(&file)?;
            doc.insert_frames(frame, count)
                .with_context(|| format!("failed to insert {count} frame(s) after {frame}"))?;
            if lerp {
                doc.lerp_keyframes();
            }
            save(&doc, &output)
        }
        Commands::Lerp {
            file,
            keyframes,
            output,
        } => {
            let mut doc = open(&file)?;
            for frame in keyframes {
                doc.set_keyframe(frame)
                    .with_context(|| format!("invalid keyframe {frame}"))?;
            }
            doc.lerp_keyframes();
            save(&doc, &output)
        }
        Commands::Drag(args) => drag(args),
        Commands::Play {
            file,
            duration,
            speed,
        } => play(&file, duration, speed),
    }
}

fn open(path: &Path) -> Result<MotionDocument> {
    MotionDocument::open(path).with_context(|| format!("failed to load {}", path.display()))
}

fn save(doc: &MotionDocument, path: &Path) -> Result<()> {
    doc.save(path)
        .with_context(|| format!("failed to save {}", path.display()))?;
    log::info!("wrote {} frame(s) to {}", doc.num_frames(), path.display());
    Ok(())
}

fn info(path: &Path) -> Result<()> {
    let doc = open(path)?;
    println!("motion: {}", doc.motion_name());
    println!(
        "frames: {} at {}s ({}s)",
        doc.num_frames(),
        doc.interval(),
        doc.duration()
    );
    println!("channels: {}", doc.num_channels());
    for joint in doc.joints() {
        let depth = std::iter::successors(joint.parent, |&p| doc.joint(p).and_then(|j| j.parent))
            .count();
        let channels: Vec<&str> = joint
            .channels
            .iter()
            .filter_map(|&c| doc.channel(c))
            .map(|c| c.kind.token())
            .collect();
        println!(
            "{:indent$}{} [{}] offset {}{}",
            "",
            joint.name,
            channels.join(" "),
            joint.offset,
            if joint.has_site() { " (end site)" } else { "" },
            indent = depth * 2
        );
    }
    if let Some(bounds) = doc.bounds() {
        println!(
            "root bounds: min {} max {} size {}",
            bounds.min, bounds.max, bounds.size
        );
    }
    for warning in doc.warnings() {
        println!("warning: {warning}");
    }
    Ok(())
}

fn vec3_json(v: DVec3) -> serde_json::Value {
    json!([v.x, v.y, v.z])
}

fn pose(path: &Path, frame: usize, scale: f64, center: bool, segments: bool) -> Result<()> {
    let doc = open(path)?;
    let model = match doc.bounds() {
        Some(bounds) if center => DMat4::from_translation(bounds.centering_offset() * scale),
        _ => DMat4::IDENTITY,
    };
    let pose = Pose::evaluate(&doc, frame, scale, model)
        .with_context(|| format!("failed to evaluate frame {frame}"))?;

    let joints: Vec<_> = doc
        .joints()
        .iter()
        .map(|joint| {
            json!({
                "i": joint.index,
                "name": joint.name,
                "parent": joint.parent,
                "position": pose.global_position(joint.index).map(vec3_json),
                "effector": pose.effector_position(&doc, joint.index).map(vec3_json),
                "angles": pose.joint_angles(joint.index).map(vec3_json),
            })
        })
        .collect();

    let mut out = json!({
        "motion": doc.motion_name(),
        "frame": frame,
        "time": frame as f64 * doc.interval(),
        "joints": joints,
    });
    if segments {
        let bones: Vec<_> = pose
            .bone_segments(&doc)
            .into_iter()
            .map(|s| json!({"joint": s.joint, "start": vec3_json(s.start), "end": vec3_json(s.end)}))
            .collect();
        out["segments"] = json!(bones);
    }

    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn solver_settings(args: &DragArgs) -> Result<SolverSettings> {
    let mut settings = match &args.settings {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("invalid solver settings in {}", path.display()))?
        }
        None => SolverSettings::default(),
    };

    if let Some(mode) = args.mode {
        settings.mode = match mode {
            Mode::Rotate => MoveMode::Rotate,
            Mode::Ik => MoveMode::InverseKinematics,
        };
    }
    if let Some(lambda) = args.lambda {
        settings.damping = true;
        settings.lambda = lambda;
    }
    if let Some(gains) = &args.gains {
        let [x, y, z] = gains.as_slice() else {
            bail!("--gains takes exactly three values");
        };
        settings.control = true;
        settings.gains = [*x, *y, *z];
    }
    if let Some(axes) = &args.axes {
        settings.axes = AxisMask {
            x: axes.contains('x'),
            y: axes.contains('y'),
            z: axes.contains('z'),
        };
    }
    if args.no_clamp {
        settings.clamp_reach = false;
    }
    settings.validate()?;
    Ok(settings)
}

fn drag(args: DragArgs) -> Result<()> {
    let mut doc = open(&args.file)?;
    let settings = solver_settings(&args)?;
    let [x, y, z] = args.delta.as_slice() else {
        bail!("--delta takes exactly three values");
    };
    let delta = DVec3::new(*x, *y, *z);

    let mut selection = Vec::with_capacity(args.joints.len());
    for joint in &args.joints {
        let index = match joint.parse::<usize>() {
            Ok(index) if doc.joint(index).is_some() => index,
            _ => doc.find_joint(joint)?,
        };
        selection.push(index);
    }

    let solver = IkSolver::new(settings);
    let mut applied = 0usize;
    for sample in 0..args.samples {
        let pose = Pose::evaluate(&doc, args.frame, args.scale, DMat4::IDENTITY)
            .with_context(|| format!("failed to evaluate frame {}", args.frame))?;
        match solver.apply(&mut doc, &pose, &selection, delta)? {
            SolveOutcome::Applied => applied += 1,
            SolveOutcome::Unchanged => log::debug!("sample {sample}: nothing to apply"),
            SolveOutcome::Discarded => log::warn!("sample {sample}: update discarded"),
        }
    }
    log::info!("applied {applied} of {} sample(s)", args.samples);

    save(&doc, &args.output)
}

fn play(path: &Path, duration: f64, speed: f64) -> Result<()> {
    let doc = open(path)?;
    if doc.num_frames() == 0 {
        bail!("{} has no frames", path.display());
    }

    let mut playback = Playback::new();
    playback.set_speed(speed);
    playback.play();
    println!("{:>8} {}", 0.0, playback.frame());

    let mut elapsed = 0.0;
    while elapsed < duration {
        elapsed += DEFAULT_TICK_MS;
        if playback.tick(DEFAULT_TICK_MS, doc.interval(), doc.num_frames()) {
            println!("{:>8} {}", elapsed, playback.frame());
        }
    }
    Ok(())
}

//! Headless driver: flies the bird for a number of frames and reports where it ended up.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use aquila::{Bird, BirdConfig, DrawQueue};

#[derive(Parser, Debug)]
#[command(name = "aquila", version, about = "Fly an articulated bird around a spline loop")]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of frames to simulate
    #[arg(short, long, default_value_t = 600)]
    frames: u32,

    /// Keep the bird in place instead of following the path
    #[arg(long)]
    no_move: bool,

    /// Hold the wings and body at their rest pose
    #[arg(long)]
    no_animate: bool,

    /// Load the part meshes and texture and queue real draws
    #[arg(long)]
    assets: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => BirdConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => BirdConfig::default(),
    };

    let (mut bird, mut queue) = if cli.assets {
        let (bird, assets) = Bird::load(&config).context("building bird with assets")?;
        (bird, DrawQueue::with_assets(assets))
    } else {
        (Bird::new(&config)?, DrawQueue::new())
    };

    bird.set_moving(!cli.no_move);
    bird.set_animating(!cli.no_animate);

    log::info!(
        "flying {} frames over {} waypoints ({} steps per loop)",
        cli.frames,
        bird.path().waypoints().len(),
        bird.path().loop_steps()
    );

    let mut draws = 0;
    let mut triangles = 0;
    for frame_index in 0..cli.frames {
        let frame = bird.compute_frame();
        frame.plan.submit(&mut queue);
        draws += queue.queued().len();
        triangles += queue.queued_triangles();
        queue.clear_queue();

        log::trace!(
            "frame {frame_index}: position {} yaw {:.2} phase {:.2}",
            frame.pose.position,
            frame.pose.yaw_degrees,
            frame.pose.phase
        );
    }

    let pose = bird.pose();
    log::info!(
        "finished on segment {} at {} facing {:.1} deg ({} draws, {} triangles)",
        bird.path().cursor().segment,
        pose.position,
        pose.yaw_degrees,
        draws,
        triangles
    );

    Ok(())
}

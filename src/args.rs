use std::path::PathBuf;

use clap::{value_parser, Args as ClapArgs, Parser, Subcommand};

pub fn parse_args() -> Args {
    Args::parse()
}

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[arg(
        short,
        long,
        default_value = "lapkeeper-data",
        help = "Directory holding the session and course store"
    )]
    pub data_dir: PathBuf,

    #[arg(
        long,
        default_value = "false",
        help = "Keep data in a plain JSON file instead of SQLite"
    )]
    pub json_store: bool,

    #[arg(
        short,
        long,
        default_value = "false",
        help = "Print results as JSON"
    )]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage preset and user courses
    #[command(subcommand)]
    Courses(CourseCommand),

    /// Browse saved sessions
    #[command(subcommand)]
    Sessions(SessionCommand),

    /// Show the fastest lap ever recorded on a course
    Best {
        #[arg(short, long, help = "Course id")]
        course: String,
    },

    /// Ride a synthetic track around a course and save the session
    Simulate(SimulateArgs),
}

#[derive(Debug, Subcommand)]
pub enum CourseCommand {
    List,
    Add {
        #[arg(short, long)]
        name: String,

        #[arg(long, allow_hyphen_values = true, help = "Start/finish latitude")]
        lat: f64,

        #[arg(long, allow_hyphen_values = true, help = "Start/finish longitude")]
        lon: f64,

        #[arg(
            short,
            long,
            default_value = "50",
            help = "Crossing radius around the start/finish point, in metres"
        )]
        tolerance: f64,

        #[arg(long, help = "Published lap length in metres (informational)")]
        lap_length: Option<f64>,
    },
    Delete {
        id: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum SessionCommand {
    List {
        #[arg(short, long, help = "Only sessions run on this course id")]
        course: Option<String>,
    },
    Show {
        id: String,
    },
    Delete {
        id: String,
    },
}

#[derive(Debug, ClapArgs)]
pub struct SimulateArgs {
    #[arg(short, long, default_value = "preset-tsukuba", help = "Course id")]
    pub course: String,

    #[arg(
        short,
        long,
        default_value = "3",
        value_parser = value_parser!(u32).range(1..=50)
    )]
    pub laps: u32,

    #[arg(long, default_value = "90", help = "Average speed in km/h")]
    pub speed_kmh: f64,

    #[arg(long, default_value = "2", help = "Random position jitter in metres")]
    pub noise_m: f64,

    #[arg(
        long,
        default_value = "5",
        help = "Fixes per second",
        value_parser = value_parser!(u32).range(1..=50)
    )]
    pub hz: u32,

    #[arg(long, help = "Seed for a reproducible ride")]
    pub seed: Option<u64>,

    #[arg(long, help = "Bike name to attach to the session")]
    pub bike: Option<String>,
}

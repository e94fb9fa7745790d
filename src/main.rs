use anyhow::{bail, Context, Result};
use args::{parse_args, Args, Command, CourseCommand, SessionCommand, SimulateArgs};
use chrono::Utc;
use formatting::{format_lap, format_lap_time, format_session_line};
use lapkeeper_lib::{
    config::TimingConfig,
    geo::Coordinate,
    models::SessionSummary,
    utils::init_logging,
    AppState,
};
use log::{debug, info, warn, LevelFilter};
use serde::Serialize;
use simulate::{ride, RideParams};

mod args;
mod formatting;
mod simulate;

pub const PROGRAM_NAME: &str = env!("CARGO_PKG_NAME");

fn main() -> Result<()> {
    init_logging(LevelFilter::Info);
    debug!("Starting {PROGRAM_NAME}");

    let args = parse_args();
    debug!("{:?}", &args);

    let config = TimingConfig::from_env();
    let state = if args.json_store {
        AppState::open_json(&args.data_dir, config)?
    } else {
        AppState::open(&args.data_dir, config)?
    };

    match &args.command {
        Command::Courses(cmd) => run_courses(&state, cmd, &args),
        Command::Sessions(cmd) => run_sessions(&state, cmd, &args),
        Command::Best { course } => run_best(&state, course, &args),
        Command::Simulate(sim) => run_simulate(&state, sim, &args),
    }
}

fn run_courses(state: &AppState, cmd: &CourseCommand, args: &Args) -> Result<()> {
    match cmd {
        CourseCommand::List => {
            let courses = state.courses.list();
            if args.json {
                return print_json(&courses);
            }
            for course in courses {
                println!(
                    "{:<24} {:<32} ({:.5}, {:.5})  ±{:.0} m{}",
                    course.id,
                    course.name,
                    course.reference.latitude,
                    course.reference.longitude,
                    course.tolerance_m,
                    if course.is_preset { "  [preset]" } else { "" }
                );
            }
        }
        CourseCommand::Add {
            name,
            lat,
            lon,
            tolerance,
            lap_length,
        } => {
            let course = state.courses.create(
                name,
                Coordinate::new(*lat, *lon),
                *tolerance,
                *lap_length,
                Utc::now(),
            )?;
            if args.json {
                return print_json(&course);
            }
            println!("{}", course.id);
        }
        CourseCommand::Delete { id } => {
            if !state.courses.delete(id)? {
                warn!("Nothing deleted: {id} is a preset or does not exist");
            }
        }
    }
    Ok(())
}

fn run_sessions(state: &AppState, cmd: &SessionCommand, args: &Args) -> Result<()> {
    match cmd {
        SessionCommand::List { course } => {
            let sessions = match course {
                Some(course_id) => state.sessions.sessions_for_course(course_id),
                None => state.sessions.all_sessions(),
            };
            if args.json {
                let summaries: Vec<SessionSummary> =
                    sessions.iter().map(SessionSummary::from).collect();
                return print_json(&summaries);
            }
            if sessions.is_empty() {
                info!("No saved sessions");
            }
            for session in &sessions {
                println!("{}", format_session_line(session));
            }
        }
        SessionCommand::Show { id } => {
            let session = state
                .sessions
                .get(id)
                .with_context(|| format!("no session with id {id}"))?;
            if args.json {
                return print_json(&session);
            }
            println!("{}", format_session_line(&session));
            for lap in &session.laps {
                println!("  {}", format_lap(lap));
            }
            println!(
                "  total {:.0} m in {}, average lap {}",
                session.total_distance_m,
                format_lap_time(Some(session.duration(Utc::now()))),
                format_lap_time(session.average_lap_time())
            );
        }
        SessionCommand::Delete { id } => {
            if !state.sessions.delete(id)? {
                bail!("no session with id {id}");
            }
        }
    }
    Ok(())
}

fn run_best(state: &AppState, course_id: &str, args: &Args) -> Result<()> {
    let Some(lap) = state.sessions.best_lap_for_course(course_id) else {
        info!("No completed laps on {course_id}");
        return Ok(());
    };
    if args.json {
        return print_json(&lap);
    }
    println!("{}", format_lap(&lap));
    Ok(())
}

fn run_simulate(state: &AppState, sim: &SimulateArgs, args: &Args) -> Result<()> {
    let course = state
        .courses
        .get(&sim.course)
        .with_context(|| format!("unknown course {}", sim.course))?;
    let params = RideParams {
        laps: sim.laps,
        speed_kmh: sim.speed_kmh,
        noise_m: sim.noise_m,
        hz: sim.hz,
        seed: sim.seed,
        bike: sim.bike.clone(),
    };

    info!(
        "Simulating {} laps of {} at {:.0} km/h",
        params.laps, course.name, params.speed_kmh
    );
    let session = ride(&course, &params, Utc::now())?;
    state.sessions.save(&session)?;

    if args.json {
        return print_json(&SessionSummary::from(&session));
    }
    println!("{}", format_session_line(&session));
    for lap in &session.laps {
        println!("  {}", format_lap(lap));
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

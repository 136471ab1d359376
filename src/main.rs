use std::process::exit;

use clap::Parser;
use tracing::{error, info};

use stable_fluids_2d::{
    postprocessing::postprocess,
    preprocessing::{cli::CliArgs, store::ConfigStore},
    sim::{simulation::Simulation, task::spawn_sim_thread},
};

fn main() {
    tracing_subscriber::fmt::init();

    let args = CliArgs::parse();

    let mut store = ConfigStore::load_or_create(&args.config_file).unwrap_or_else(|err| {
        error!("Failed to open {:?}: {}", args.config_file, err);
        exit(1);
    });

    if args.list_configs {
        println!("{}", store.table());
        return;
    }

    if let Some(key) = &args.remove_config {
        match store.remove(key) {
            Some(removed) => {
                if let Err(err) = store.flush() {
                    error!("Failed to write {:?}: {}", store.path(), err);
                    exit(1);
                }
                info!("Removed configuration '{}'", removed.name);
            }
            None => {
                error!("No configuration '{}' in {:?}", key, store.path());
                exit(1);
            }
        }
        return;
    }

    let simulation_input = args.create_input(&store).unwrap_or_else(|err| {
        error!("{}", err);
        exit(1);
    });

    let settings = args.run_settings().unwrap_or_else(|err| {
        error!("{}", err);
        exit(1);
    });

    if args.new_config.is_some() {
        match store.write(simulation_input.clone()) {
            Ok(true) => info!("Stored configuration '{}'", simulation_input.name),
            Ok(false) => {}
            Err(err) => error!("Failed to store configuration: {}", err),
        }
    }

    if args.no_simulation {
        return;
    }

    simulation_input.log();
    settings.log();

    let solver = simulation_input.build_solver().unwrap_or_else(|err| {
        error!("Invalid simulation grid: {}", err);
        exit(1);
    });

    let sim = Simulation::new(
        solver,
        simulation_input.kinematic_viscosity(),
        simulation_input.diffusion,
        simulation_input.dt,
        Some(settings.frames),
    );

    let sim_output = match spawn_sim_thread(
        sim,
        settings.mode.clone(),
        simulation_input.window_scale,
    )
    .join()
    {
        Ok(output) => output,
        Err(_) => {
            error!("Simulation thread panicked");
            exit(1);
        }
    };

    if let Err(err) = postprocess(simulation_input, settings, sim_output, &mut store) {
        error!("Post-processing failed: {}", err);
        exit(1);
    }
}

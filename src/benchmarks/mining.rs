use tracing::{info,debug};
use tracing_subscriber;

use rand::prelude::*;
use rand::rngs::StdRng;

use std::time::*;

use rulemine::*;
use rulemine::data::synthetic::{SyntheticShape, generate_table};

fn main() -> Result<(), String> {
    prepare_logging();

    let shapes = [
	SyntheticShape{ instances: 500, certain: 4, uncertain: 0, ..Default::default() },
	SyntheticShape{ instances: 500, certain: 3, uncertain: 2, ..Default::default() },
	SyntheticShape{ instances: 1000, certain: 2, uncertain: 3, labels: 3, ..Default::default() },
    ];

    let mut rng = StdRng::seed_from_u64( 42 );
    for shape in &shapes {
	let table = generate_table( shape, &mut rng ).map_err( |e| e.to_string() )?;
	info!( "Start benchmark: {} instances, {} certain and {} uncertain attributes, {} labels",
	       shape.instances, shape.certain, shape.uncertain, shape.labels );
	benchmark_modes( &table, 0.02, 0.9 )?;
    }

    Result::Ok( () )
}

fn benchmark_modes( table: &AttributeTable, min_support: f64, min_cover_prob: f64 ) -> Result<(), String> {
    let parameters = MiningParameters::with_relative_support( min_support, table.instance_count(), min_cover_prob )
	.map_err( |e| e.to_string() )?;

    let mut without_pruning = parameters.clone();
    without_pruning.set_pruning( false );
    let mut approximate = parameters.clone();
    approximate.set_exactness( Exactness::Approximate );

    for (name, parameters) in [ ("exact", parameters), ("exact without pruning", without_pruning), ("approximate", approximate) ] {
	let (time, mined) = benchmark_mining( table, parameters );
	info!( "Result: {name} mining took {}ms and kept {} rules", time.as_millis(), mined.rules.len() );
	debug!( "{:?}", mined.statistics );
    }
    Ok( () )
}

fn benchmark_mining( table: &AttributeTable, parameters: MiningParameters ) -> (Duration, MinedRules) {
    let mut miner = DepthFirstMiner::new( parameters );
    let start = Instant::now();
    let mined = miner.mine( table );
    (Instant::now().duration_since( start ), mined)
}

fn prepare_logging() {
    let tracer = tracing_subscriber::fmt::fmt()
	.with_max_level( tracing_subscriber::filter::LevelFilter::INFO )
	.finish();
    tracing::subscriber::set_global_default( tracer ).unwrap();
}

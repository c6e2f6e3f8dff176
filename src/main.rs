use clap::{ArgAction, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::filter::LevelFilter;

use rulemine::*;
use rulemine::model::{RuleFormatter, records};
use rulemine::predict::{Classifier, FeatureExporter};

#[derive( Parser, Debug )]
#[command( name = "miner" )]
#[command( about = "Mines classification rules from data with uncertain attributes" )]
#[command( version )]
struct Args {
    #[command( subcommand )]
    command: Command,

    /// More log output, repeat for trace level
    #[arg( short, long, action = ArgAction::Count, global = true )]
    verbose: u8,
}

#[derive( Subcommand, Debug )]
enum Command {
    /// Mine rules and write them to a rule file
    Mine {
	/// Data set in the uncertain table format
	data: String,
	/// Identifier of the label attribute
	label: AttributeId,
	/// Minimum support as a fraction of the instances
	min_support: f64,
	/// Coverage probability beyond which further rules for an instance are redundant
	min_cover_prob: f64,
	/// Output rule file
	rules: String,

	/// Use expected supports instead of expected confidences for uncertain itemsets
	#[arg( long )]
	approximate: bool,

	/// Compute every confidence to the end
	#[arg( long )]
	no_pruning: bool,

	/// Also write the rules as JSON
	#[arg( long )]
	json: Option<String>,
    },

    /// Predict labels with a rule file
    Classify {
	data: String,
	label: AttributeId,
	rules: String,
	/// Output file with one predicted label per line
	predictions: String,
    },

    /// Write rule match probabilities as sparse feature vectors
    Export {
	data: String,
	label: AttributeId,
	rules: String,
	/// Output file with one feature vector per line
	features: String,
    },
}

fn main() -> Result<(), String> {
    let args = Args::parse();
    prepare_logging( args.verbose );
    run( args.command ).map_err( |e| e.to_string() )
}

fn run( command: Command ) -> rulemine::error::Result<()> {
    match command {
	Command::Mine{ data, label, min_support, min_cover_prob, rules, approximate, no_pruning, json } => {
	    let table = io::read_table( &data, label )?;
	    let mut parameters = MiningParameters::with_relative_support( min_support, table.instance_count(), min_cover_prob )?;
	    if approximate {
		parameters.set_exactness( Exactness::Approximate );
	    }
	    parameters.set_pruning( !no_pruning );

	    let mut miner = DepthFirstMiner::new( parameters );
	    let mined = miner.mine( &table );
	    let records = records( &mined.rules, &table );
	    io::write_rules( &records, &RuleFormatter, &rules )?;
	    if let Some( path ) = json {
		io::write_model( &records, &path )?;
	    }
	    info!( "wrote {} rules to {rules}", records.len() );
	},
	Command::Classify{ data, label, rules, predictions } => {
	    let table = io::read_table( &data, label )?;
	    let classifier = Classifier::new( &io::read_rules( &rules )?, &table )?;
	    let result = classifier.classify( &table );
	    io::write_lines( result.labels.iter().map( |label| label.to_string() ), &predictions )?;
	    println!( "Accuracy: {}", model::format_decimal( result.accuracy, 1, 4 ));
	},
	Command::Export{ data, label, rules, features } => {
	    let table = io::read_table( &data, label )?;
	    let exporter = FeatureExporter::new( &io::read_rules( &rules )?, &table )?;
	    io::write_lines( exporter.export( &table ), &features )?;
	    info!( "wrote features of {} instances to {features}", table.instance_count() );
	},
    }
    Ok( () )
}

fn prepare_logging( verbosity: u8 ) {
    let level = match verbosity {
	0 => LevelFilter::INFO,
	1 => LevelFilter::DEBUG,
	_ => LevelFilter::TRACE,
    };
    let tracer = tracing_subscriber::fmt::fmt()
	.with_max_level( level )
	.finish();
    if tracing::subscriber::set_global_default( tracer ).is_err() {
	eprintln!( "a global logger was already installed" );
    }
}

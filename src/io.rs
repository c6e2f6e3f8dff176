use std::path::Path;
use std::fs::File;
use std::io::{BufReader, BufRead, BufWriter, Write};

use bit_set::BitSet;
use bit_vec::BitVec;
use tracing::{debug, info};

use crate::data::{Attribute, AttributeId, AttributeTable, LabelColumn, Label, Value};
use crate::error::{MineError, Result};
use crate::model::{RuleRecord, parse_rule};

/// Converts a structure into a string
pub trait PrettyFormatter<T> {
    fn format_pretty( &self, object: &T ) -> String;
}

/// Header of a data file
#[derive( Debug, Default )]
struct Header {
    line_count: Option<usize>,
    column_count: Option<usize>,
    value_counts: Option<Vec<usize>>,
    /// attributes holding probability distributions
    uncertain: Option<BitSet>,
}

/// Column under construction
enum ColumnBuilder {
    Label( Vec<Label> ),
    Certain( Vec<Option<Value>> ),
    Uncertain( Vec<Vec<f64>> ),
}

/// Reads a data file into a table, using the attribute `label_id` as class label.
pub fn read_table( path: &str, label_id: AttributeId ) -> Result<AttributeTable> {
    let file = File::open( Path::new( path ))?;
    let table = parse_table( BufReader::new( file ), label_id )?;
    info!( "read {} instances with {} usable attributes from {path}", table.instance_count(), table.column_count() );
    Ok( table )
}

/// Parses the header sections `#LINE_NUM`, `#COL_NUM`, `#VALUE_COUNTS`, `#UNCERTAIN_MASKS`
/// followed by `#DATA` and one instance per line.
pub fn parse_table<R: BufRead>( reader: R, label_id: AttributeId ) -> Result<AttributeTable> {
    let mut lines = reader.lines().enumerate().map( |(index, line)| (index + 1, line) );
    let mut header = Header::default();

    // header: keyword lines followed by their value line
    loop {
	let (number, line) = match lines.next() {
	    Some( (number, line) ) => (number, line?),
	    None => return Err( MineError::format( 0, "missing #DATA section" )),
	};
	let keyword = line.trim();
	if keyword.starts_with( "#DATA" ) {
	    break;
	}
	if !keyword.starts_with( '#' ) {
	    continue;
	}
	let (value_number, value_line) = match lines.next() {
	    Some( (n, l) ) => (n, l?),
	    None => return Err( MineError::format( number, format!( "{keyword} without value" ))),
	};
	if keyword.starts_with( "#LINE_NUM" ) {
	    header.line_count = Some( parse_number( value_line.trim(), value_number )? );
	} else if keyword.starts_with( "#COL_NUM" ) {
	    header.column_count = Some( parse_number( value_line.trim(), value_number )? );
	} else if keyword.starts_with( "#VALUE_COUNTS" ) {
	    let counts = value_line.split_whitespace()
		.map( |chunk| parse_number( chunk, value_number ))
		.collect::<Result<Vec<usize>>>()?;
	    header.value_counts = Some( counts );
	} else if keyword.starts_with( "#UNCERTAIN_MASKS" ) {
	    let mut mask = BitVec::new();
	    for chunk in value_line.split_whitespace() {
		mask.push( parse_number::<u8>( chunk, value_number )? != 0 );
	    }
	    header.uncertain = Some( BitSet::from_bit_vec( mask ));
	}
    }

    let missing = |section: &str| MineError::format( 0, format!( "header lacks {section}" ));
    let line_count = header.line_count.ok_or_else( || missing( "#LINE_NUM" ))?;
    let column_count = header.column_count.ok_or_else( || missing( "#COL_NUM" ))?;
    let value_counts = header.value_counts.ok_or_else( || missing( "#VALUE_COUNTS" ))?;
    let uncertain = header.uncertain.ok_or_else( || missing( "#UNCERTAIN_MASKS" ))?;
    if value_counts.len() != column_count {
	return Err( MineError::format( 0, format!( "{} value counts for {column_count} columns", value_counts.len() )));
    }
    if label_id >= column_count {
	return Err( MineError::configuration( format!( "label attribute {label_id} does not exist, there are {column_count} attributes" )));
    }
    if uncertain.contains( label_id ) {
	return Err( MineError::configuration( format!( "label attribute {label_id} must not be uncertain" )));
    }
    debug!( "header: {line_count} lines, {column_count} columns, value counts {value_counts:?}" );

    let mut builders: Vec<ColumnBuilder> = ( 0 .. column_count )
	.map( |k| {
	    if k == label_id { ColumnBuilder::Label( Vec::with_capacity( line_count )) }
	    else if uncertain.contains( k ) { ColumnBuilder::Uncertain( Vec::with_capacity( line_count )) }
	    else { ColumnBuilder::Certain( Vec::with_capacity( line_count )) }
	}).collect();

    let mut read = 0;
    while read < line_count {
	let (number, line) = match lines.next() {
	    Some( (number, line) ) => (number, line?),
	    None => return Err( MineError::format( 0, format!( "expected {line_count} instances, found {read}" ))),
	};
	let tokens = tokenize( &line );
	if tokens.len() != column_count {
	    return Err( MineError::format( number, format!( "expected {column_count} values, found {}", tokens.len() )));
	}
	for (k, (token, builder)) in tokens.iter().zip( builders.iter_mut() ).enumerate() {
	    let domain = value_counts[ k ];
	    match builder {
		ColumnBuilder::Label( values ) => match parse_certain( token, domain, number )? {
		    Some( label ) => values.push( label ),
		    None => return Err( MineError::format( number, "label is missing" )),
		},
		ColumnBuilder::Certain( values ) => values.push( parse_certain( token, domain, number )? ),
		ColumnBuilder::Uncertain( rows ) => rows.push( parse_distribution( token, domain, number )? ),
	    }
	}
	read += 1;
    }

    let mut labels = None;
    let mut attributes = Vec::with_capacity( column_count );
    for (k, builder) in builders.into_iter().enumerate() {
	match builder {
	    ColumnBuilder::Label( values ) => labels = Some( LabelColumn::new( k, value_counts[ k ], values )),
	    ColumnBuilder::Certain( values ) => attributes.push( Attribute::certain( k, value_counts[ k ], values )),
	    ColumnBuilder::Uncertain( rows ) => attributes.push( Attribute::uncertain( k, value_counts[ k ], rows )),
	}
    }
    let labels = labels.expect( "label column was created above" );
    AttributeTable::new( attributes, labels )
}

fn parse_number<T: std::str::FromStr>( chunk: &str, line: usize ) -> Result<T> {
    chunk.parse::<T>().map_err( |_| MineError::format( line, format!( "'{chunk}' is not a number" )))
}

/// Splits a data line into values. Distributions in braces form a single token.
fn tokenize( line: &str ) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut rest = line;
    loop {
	rest = rest.trim_start_matches( |c: char| c.is_whitespace() || c == ',' );
	if rest.is_empty() {
	    return tokens;
	}
	let end = if rest.starts_with( '{' ) {
	    rest.find( '}' ).map_or( rest.len(), |close| close + 1 )
	} else {
	    rest.find( |c: char| c.is_whitespace() || c == ',' || c == '{' ).unwrap_or( rest.len() )
	};
	tokens.push( &rest[ .. end ] );
	rest = &rest[ end .. ];
    }
}

/// A value or `-1` for missing
fn parse_certain( token: &str, domain: usize, line: usize ) -> Result<Option<Value>> {
    if token == "-1" {
	return Ok( None );
    }
    let value: Value = parse_number( token, line )?;
    if value >= domain {
	return Err( MineError::format( line, format!( "value {value} outside domain of {domain} values" )));
    }
    Ok( Some( value ))
}

/// `{value:probability, ...}`, unlisted values have probability 0
fn parse_distribution( token: &str, domain: usize, line: usize ) -> Result<Vec<f64>> {
    let body = token.strip_prefix( '{' ).and_then( |t| t.strip_suffix( '}' ))
	.ok_or_else( || MineError::format( line, format!( "'{token}' is not a distribution" )))?;
    let mut distribution = vec!( 0.0; domain );
    for pair in body.split( ',' ).map( str::trim ).filter( |p| !p.is_empty() ) {
	let (value, probability) = pair.split_once( ':' )
	    .ok_or_else( || MineError::format( line, format!( "'{pair}' is not a value:probability pair" )))?;
	let value: Value = parse_number( value.trim(), line )?;
	let probability: f64 = parse_number( probability.trim(), line )?;
	if value >= domain {
	    return Err( MineError::format( line, format!( "value {value} outside domain of {domain} values" )));
	}
	if !( 0.0 ..= 1.0 ).contains( &probability ) {
	    return Err( MineError::format( line, format!( "probability {probability} outside [0, 1]" )));
	}
	distribution[ value ] = probability;
    }
    Ok( distribution )
}

/// Reads a rule file written by [`write_rules`]
pub fn read_rules( path: &str ) -> Result<Vec<RuleRecord>> {
    let file = File::open( Path::new( path ))?;
    let mut rules = Vec::new();
    for (index, line) in BufReader::new( file ).lines().enumerate() {
	let line = line?;
	if line.trim().is_empty() {
	    continue;
	}
	rules.push( parse_rule( &line, index + 1 )? );
    }
    debug!( "read {} rules from {path}", rules.len() );
    Ok( rules )
}

/// Writes one line per rule using the formatter
pub fn write_rules<F: PrettyFormatter<RuleRecord>>( records: &[RuleRecord], formatter: &F, path: &str ) -> Result<()> {
    write_lines( records.iter().map( |record| formatter.format_pretty( record )), path )
}

pub fn write_lines<I: IntoIterator<Item = String>>( lines: I, path: &str ) -> Result<()> {
    let mut writer = BufWriter::new( File::create( Path::new( path ))? );
    for line in lines {
	writeln!( writer, "{line}" )?;
    }
    writer.flush()?;
    Ok( () )
}

/// Writes a serializeable model to a file
pub fn write_model<M: serde::Serialize>( model: &M, path: &str ) -> Result<()> {
    let model_string = serde_json::to_string( model )?;
    let mut file = File::create( Path::new( path ))?;
    write!( file, "{}", model_string )?;
    Ok( () )
}

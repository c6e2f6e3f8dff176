
use rand::Rng;
use rand::distributions::Distribution;
use statrs::distribution::{Beta, DiscreteUniform};

use crate::error::{MineError, Result};

use super::*;

/// Shape of a randomly generated data set.
#[derive( Debug, Clone )]
pub struct SyntheticShape {
    pub instances: usize,
    pub certain: usize,
    pub uncertain: usize,
    /// number of values of every attribute
    pub domain: usize,
    pub labels: usize,
    /// probability that an attribute value is derived from the label
    pub correlation: f64,
    /// probability that a certain value is missing
    pub missing: f64,
    /// Beta shape parameters for the mass an uncertain attribute puts on its true value
    pub mass_shape: (f64, f64),
}

impl Default for SyntheticShape {
    fn default() -> Self {
	SyntheticShape {
	    instances: 200,
	    certain: 3,
	    uncertain: 2,
	    domain: 3,
	    labels: 2,
	    correlation: 0.6,
	    missing: 0.05,
	    mass_shape: (4.0, 2.0),
	}
    }
}

/// Generates a table whose attributes are noisy copies of the label.
/// Attribute ids start at 1, the label has id 0.
pub fn generate_table<R: Rng>( shape: &SyntheticShape, rng: &mut R ) -> Result<AttributeTable> {
    let to_error = |e: statrs::StatsError| MineError::configuration( e.to_string() );
    if shape.domain < 2 || shape.labels < 1 {
	return Err( MineError::configuration( "synthetic data needs at least two values and one label" ));
    }
    let label_dist = DiscreteUniform::new( 0, shape.labels as i64 - 1 ).map_err( to_error )?;
    let value_dist = DiscreteUniform::new( 0, shape.domain as i64 - 1 ).map_err( to_error )?;
    let mass_dist = Beta::new( shape.mass_shape.0, shape.mass_shape.1 ).map_err( to_error )?;

    let labels: Vec<Label> = ( 0 .. shape.instances )
	.map( |_| label_dist.sample( rng ) as Label )
	.collect();

    // the hidden value an attribute would take without noise
    let draw_value = |rng: &mut R, label: Label| -> Value {
	if rng.gen_bool( shape.correlation ) { label % shape.domain }
	else { value_dist.sample( rng ) as Value }
    };

    let mut attributes = Vec::with_capacity( shape.certain + shape.uncertain );
    for id in 1 ..= shape.certain {
	let values = labels.iter()
	    .map( |label| {
		let value = draw_value( rng, *label );
		if rng.gen_bool( shape.missing ) { None } else { Some( value ) }
	    }).collect();
	attributes.push( Attribute::certain( id, shape.domain, values ));
    }
    for id in shape.certain + 1 ..= shape.certain + shape.uncertain {
	let rows = labels.iter()
	    .map( |label| {
		let value = draw_value( rng, *label );
		let mass: f64 = mass_dist.sample( rng );
		let rest = ( 1.0 - mass ) / ( shape.domain - 1 ) as f64;
		( 0 .. shape.domain ).map( |v| if v == value { mass } else { rest } ).collect()
	    }).collect();
	attributes.push( Attribute::uncertain( id, shape.domain, rows ));
    }

    AttributeTable::new( attributes, LabelColumn::new( 0, shape.labels, labels ))
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_generated_shape() {
	let shape = SyntheticShape{ instances: 50, certain: 2, uncertain: 3, ..Default::default() };
	let mut rng = StdRng::seed_from_u64( 7 );
	let table = generate_table( &shape, &mut rng ).unwrap();

	assert_eq!( table.instance_count(), 50 );
	assert_eq!( table.column_count(), 5 );
	assert_eq!( table.certain_count(), 2 );
	for attribute in &table.attributes()[ 2 .. ] {
	    if let Column::Uncertain( rows ) = attribute.column() {
		for row in rows {
		    let total: f64 = row.iter().sum();
		    assert!( ( total - 1.0 ).abs() < 1e-9 );
		}
	    } else {
		panic!( "expected uncertain column" );
	    }
	}
    }
}


use std::cmp::Ordering;

use crate::error::{MineError, Result};

pub mod synthetic;

/// Identifier of an attribute as declared in the input file
pub type AttributeId = usize;
/// Categorical value of an attribute
pub type Value = usize;
/// Class label
pub type Label = usize;
/// Index of a training instance (row)
pub type Instance = usize;
pub type Count = u64;

/// Values of one attribute for all instances.
#[derive( Debug, Clone, PartialEq )]
pub enum Column {
    /// One value per instance, `None` if the value is missing
    Certain( Vec<Option<Value>> ),
    /// One probability vector over the value domain per instance
    Uncertain( Vec<Vec<f64>> ),
}

#[derive( Debug, Clone, PartialEq )]
pub struct Attribute {
    id: AttributeId,
    /// number of distinct values
    domain: usize,
    column: Column,
}

#[derive( Debug, Clone, PartialEq )]
pub struct LabelColumn {
    id: AttributeId,
    domain: usize,
    values: Vec<Label>,
}

/// Column store of a data set with mixed certain and uncertain attributes.
///
/// Invariant: certain attributes come before uncertain attributes and attributes
/// of the same kind are ordered by id. The enumeration and the itemset comparison
/// rely on this order.
#[derive( Debug, Clone )]
pub struct AttributeTable {
    attributes: Vec<Attribute>,
    labels: LabelColumn,
    certain_count: usize,
}

impl Column {
    pub fn len( &self ) -> usize {
	match self {
	    Column::Certain( values ) => values.len(),
	    Column::Uncertain( rows ) => rows.len(),
	}
    }

    pub fn is_empty( &self ) -> bool {
	self.len() == 0
    }
}

impl Attribute {

    pub fn certain( id: AttributeId, domain: usize, values: Vec<Option<Value>> ) -> Attribute {
	Attribute{ id, domain, column: Column::Certain( values ) }
    }

    pub fn uncertain( id: AttributeId, domain: usize, rows: Vec<Vec<f64>> ) -> Attribute {
	Attribute{ id, domain, column: Column::Uncertain( rows ) }
    }

    pub fn id( &self ) -> AttributeId { self.id }
    pub fn domain( &self ) -> usize { self.domain }
    pub fn column( &self ) -> &Column { &self.column }

    pub fn is_uncertain( &self ) -> bool {
	matches!( self.column, Column::Uncertain( _ ))
    }

    /// Probability that the instance takes the given value.
    /// Certain attributes yield 1.0 on an exact match and 0.0 otherwise.
    pub fn probability( &self, instance: Instance, value: Value ) -> f64 {
	match &self.column {
	    Column::Certain( values ) => if values[ instance ] == Some( value ) { 1.0 } else { 0.0 },
	    Column::Uncertain( rows ) => rows[ instance ].get( value ).copied().unwrap_or( 0.0 ),
	}
    }

    fn validate( &self, instances: usize ) -> Result<()> {
	if self.column.len() != instances {
	    return Err( MineError::configuration( format!(
		"attribute {} has {} values but the table has {} instances", self.id, self.column.len(), instances )));
	}
	match &self.column {
	    Column::Certain( values ) => {
		if let Some( value ) = values.iter().flatten().find( |v| **v >= self.domain ) {
		    return Err( MineError::configuration( format!(
			"value {value} of attribute {} is outside its domain of {} values", self.id, self.domain )));
		}
	    },
	    Column::Uncertain( rows ) => {
		for row in rows {
		    if row.len() != self.domain {
			return Err( MineError::configuration( format!(
			    "distribution of attribute {} has {} entries instead of {}", self.id, row.len(), self.domain )));
		    }
		    if row.iter().any( |p| !( *p >= 0.0 && *p <= 1.0 )) {
			return Err( MineError::configuration( format!(
			    "attribute {} holds a probability outside [0, 1]", self.id )));
		    }
		}
	    },
	}
	Ok( () )
    }
}

impl LabelColumn {
    pub fn new( id: AttributeId, domain: usize, values: Vec<Label> ) -> LabelColumn {
	LabelColumn{ id, domain, values }
    }

    pub fn id( &self ) -> AttributeId { self.id }
    pub fn domain( &self ) -> usize { self.domain }
    pub fn values( &self ) -> &[Label] { &self.values }
}

impl AttributeTable {

    /// Builds the table from the label column and the attribute columns.
    /// Attributes with at most one value cannot discriminate anything and are dropped.
    pub fn new( mut attributes: Vec<Attribute>, labels: LabelColumn ) -> Result<AttributeTable> {
	let n = labels.values.len();
	if labels.domain == 0 {
	    return Err( MineError::configuration( "the label attribute has an empty domain" ));
	}
	if let Some( label ) = labels.values.iter().find( |l| **l >= labels.domain ) {
	    return Err( MineError::configuration( format!( "label {label} is outside the label domain of {}", labels.domain )));
	}
	for attribute in &attributes {
	    attribute.validate( n )?;
	}

	attributes.retain( |attribute| attribute.domain > 1 );
	attributes.sort_by( compare_columns );
	let certain_count = attributes.iter().take_while( |attribute| !attribute.is_uncertain() ).count();

	Ok( AttributeTable{ attributes, labels, certain_count } )
    }

    pub fn instance_count( &self ) -> usize { self.labels.values.len() }
    pub fn label_count( &self ) -> usize { self.labels.domain }
    pub fn label_id( &self ) -> AttributeId { self.labels.id }
    pub fn labels( &self ) -> &[Label] { &self.labels.values }
    pub fn label( &self, instance: Instance ) -> Label { self.labels.values[ instance ] }

    /// Number of attribute columns, the label excluded
    pub fn column_count( &self ) -> usize { self.attributes.len() }
    /// Number of certain columns. They occupy the positions 0 .. certain_count.
    pub fn certain_count( &self ) -> usize { self.certain_count }

    pub fn attribute( &self, column: usize ) -> &Attribute {
	&self.attributes[ column ]
    }

    pub fn attributes( &self ) -> &[Attribute] {
	&self.attributes
    }

    /// Returns the column position of the attribute with the given identifier
    pub fn find( &self, id: AttributeId ) -> Option<(usize, &Attribute)> {
	self.attributes.iter().enumerate().find( |(_, attribute)| attribute.id == id )
    }

    /// Counts how often every label occurs
    pub fn class_frequencies( &self ) -> Vec<Count> {
	let mut counts = vec!( 0; self.label_count() );
	for label in self.labels() {
	    counts[ *label ] += 1;
	}
	counts
    }
}

/// certain before uncertain, then by identifier
fn compare_columns( left: &Attribute, right: &Attribute ) -> Ordering {
    left.is_uncertain().cmp( &right.is_uncertain() )
	.then( left.id.cmp( &right.id ))
}

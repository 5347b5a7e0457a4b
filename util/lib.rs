/*!
This crate contains utilities shared by the other quarry crates.
*/

#![allow(clippy::tabs_in_doc_comments)]

pub mod error;
pub mod finite;
pub mod progress_counter;
pub mod table;

/// Zip any number of slices or `IntoParallelIterator`s into a single rayon parallel iterator.
#[macro_export]
macro_rules! pzip {
	($($e:expr),* $(,)*) => {
		rayon::iter::IntoParallelIterator::into_par_iter(($($e,)*))
	};
}

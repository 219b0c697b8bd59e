use lazy_static::lazy_static;

pub mod contig;
pub mod dna;
pub mod fastx;
pub mod io;
pub mod version;

lazy_static! {
    /// Return the number of cpus as a String
    pub static ref NUM_CPU: String = num_cpus::get().to_string();
}

/// Vector distances and hyperplane margins
pub mod distance;

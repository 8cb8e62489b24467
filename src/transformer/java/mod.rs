//! Java ecosystem transformers: Gradle and Maven analysers and the packaging
//! converter for jar, war and ear archives.

mod build;
mod gradle;
pub mod gradle_parser;
mod maven;
mod packager;
mod springboot;
pub mod versions;

pub use build::{BUILD_CONTAINER_NAME, DEFAULT_APP_PATH, DEFAULT_SERVICE_PORT};
pub use gradle::{GradleAnalyser, GradleAnalyserConfig};
pub use maven::{MavenAnalyser, MavenAnalyserConfig, Pom};
pub use packager::{JavaPackager, JavaPackagerConfig};

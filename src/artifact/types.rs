crate::define_tag_enum! {
    /// Routing tag of an artifact; the scheduler hands an artifact to every
    /// transformer that consumes its type.
    ArtifactType {
        GradleBuild => "gradle-build",
        MavenBuild => "maven-build",
        JarPackage => "jar-package",
        WarPackage => "war-package",
        EarPackage => "ear-package",
        Ir => "IR",
    }
}

crate::define_tag_enum! {
    /// Key of a structured payload stored on an artifact.
    ConfigType {
        Ir => "IR",
        Service => "service",
        Gradle => "gradle",
        Maven => "maven",
        SpringBoot => "spring-boot",
        ImageName => "image-name",
        Jar => "jar",
        War => "war",
        Ear => "ear",
    }
}

crate::define_tag_enum! {
    /// Key of a path list stored on an artifact.
    PathType {
        ServiceDirectory => "service-directory",
        GradleBuildFile => "gradle-build-file",
        MavenPomFile => "maven-pom-file",
        BuildContainerDockerfile => "build-container-dockerfile",
    }
}

crate::define_tag_enum! {
    /// Java archive packaging produced by a build descriptor.
    Packaging {
        Jar => "jar",
        War => "war",
        Ear => "ear",
    }
}

impl Default for Packaging {
    fn default() -> Self {
        Packaging::Jar
    }
}

impl Packaging {
    pub fn artifact_type(&self) -> ArtifactType {
        match self {
            Packaging::Jar => ArtifactType::JarPackage,
            Packaging::War => ArtifactType::WarPackage,
            Packaging::Ear => ArtifactType::EarPackage,
        }
    }

    pub fn config_type(&self) -> ConfigType {
        match self {
            Packaging::Jar => ConfigType::Jar,
            Packaging::War => ConfigType::War,
            Packaging::Ear => ConfigType::Ear,
        }
    }

    pub fn from_artifact_type(artifact_type: ArtifactType) -> Option<Self> {
        match artifact_type {
            ArtifactType::JarPackage => Some(Packaging::Jar),
            ArtifactType::WarPackage => Some(Packaging::War),
            ArtifactType::EarPackage => Some(Packaging::Ear),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_type_wire_names() {
        assert_eq!(serde_json::to_string(&ArtifactType::Ir).unwrap(), "\"IR\"");
        assert_eq!(
            serde_json::to_string(&ArtifactType::WarPackage).unwrap(),
            "\"war-package\""
        );
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        let result: Result<ConfigType, _> = serde_yaml::from_str("dockerfile");
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown ConfigType 'dockerfile'"));
        assert!(err.contains("spring-boot"));
    }

    #[test]
    fn test_from_name_round_trips_every_variant() {
        for tag in PathType::all_variants() {
            assert_eq!(PathType::from_name(tag.as_str()), Some(*tag));
        }
    }

    #[test]
    fn test_packaging_maps_to_artifact_type() {
        assert_eq!(Packaging::default(), Packaging::Jar);
        assert_eq!(Packaging::Ear.artifact_type(), ArtifactType::EarPackage);
        assert_eq!(
            Packaging::from_artifact_type(ArtifactType::WarPackage),
            Some(Packaging::War)
        );
        assert_eq!(Packaging::from_artifact_type(ArtifactType::Ir), None);
    }
}

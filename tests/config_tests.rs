use clap::Parser;
use glam::{Mat4, Vec3};
use mesh_turntable::cli::Cli;
use mesh_turntable::error::ConfigError;
use mesh_turntable::Config;

#[cfg(test)]
mod config_tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Config, ConfigError> {
        let mut argv = vec![
            "mesh-turntable",
            "--obj_path",
            "bunny.obj",
            "--gif_path",
            "bunny.gif",
            "--frames_folder_path",
            "frames",
        ];
        argv.extend_from_slice(args);
        Config::from_cli(&Cli::parse_from(argv))
    }

    #[test]
    fn test_full_command_line() {
        let config = parse(&[
            "--image_width",
            "320",
            "--image_height",
            "200",
            "--num_frames",
            "12",
            "--image_loops",
            "1",
            "--set_initial_camera_pose",
            "true",
            "--camera_pose",
            "[[1,0,0,0],[0,1,0,0.5],[0,0,1,2.5],[0,0,0,1]]",
            "--light_intensity",
            "4.5",
            "--light_color",
            "[1.0, 0.8, 0.6]",
            "--image_saturation",
            "1.3",
        ])
        .unwrap();

        assert_eq!((config.width, config.height), (320, 200));
        assert_eq!(config.num_frames, 12);
        assert_eq!(config.loop_count, 1);
        assert_eq!(
            config.initial_camera_pose,
            Some(Mat4::from_translation(Vec3::new(0.0, 0.5, 2.5)))
        );
        assert_eq!(config.light_intensity, 4.5);
        assert_eq!(config.light_color, [1.0, 0.8, 0.6]);
        assert_eq!(config.saturation, 1.3);
    }

    #[test]
    fn test_malformed_literals_are_config_errors() {
        let err = parse(&["--light_color", "[1.0, 0.8]"]).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedColor { .. }));

        let err = parse(&["--set_initial_camera_pose", "--camera_pose", "[[1,0],[0,1]]"]).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedMatrix { .. }));
        assert!(err.to_string().contains("[[1,0],[0,1]]"));
    }
}

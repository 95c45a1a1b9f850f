use glam::Mat4;
use log::debug;
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Cli;
use crate::error::ConfigError;

pub const DEFAULT_IMAGE_SIZE: u32 = 640;
pub const DEFAULT_NUM_FRAMES: u32 = 36;
pub const DEFAULT_FRAME_DURATION: Duration = Duration::from_millis(100);
pub const DEFAULT_LIGHT_INTENSITY: f64 = 3.0;
pub const DEFAULT_LIGHT_COLOR: [f32; 3] = [1.0, 1.0, 1.0];

/// Validated run parameters. Built once at startup and read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub mesh_path: PathBuf,
    pub gif_path: PathBuf,
    pub frames_dir: PathBuf,
    pub width: u32,
    pub height: u32,
    pub num_frames: u32,
    pub frame_duration: Duration,
    /// 0 loops forever
    pub loop_count: u16,
    /// Camera-to-world pose seeded before interactive adjustment
    pub initial_camera_pose: Option<Mat4>,
    pub light_intensity: f64,
    pub light_color: [f32; 3],
    pub saturation: f32,
}

impl Config {
    /// Configuration with every optional parameter at its default
    pub fn new(
        mesh_path: impl Into<PathBuf>,
        gif_path: impl Into<PathBuf>,
        frames_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            mesh_path: mesh_path.into(),
            gif_path: gif_path.into(),
            frames_dir: frames_dir.into(),
            width: DEFAULT_IMAGE_SIZE,
            height: DEFAULT_IMAGE_SIZE,
            num_frames: DEFAULT_NUM_FRAMES,
            frame_duration: DEFAULT_FRAME_DURATION,
            loop_count: 0,
            initial_camera_pose: None,
            light_intensity: DEFAULT_LIGHT_INTENSITY,
            light_color: DEFAULT_LIGHT_COLOR,
            saturation: 1.0,
        }
    }

    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        if cli.image_width == 0 {
            return Err(invalid("image_width", "must be at least 1"));
        }
        if cli.image_height == 0 {
            return Err(invalid("image_height", "must be at least 1"));
        }
        if cli.num_frames == 0 {
            return Err(invalid("num_frames", "must be at least 1"));
        }
        let frame_duration = positive_seconds(cli.image_duration)?;
        if !(cli.light_intensity.is_finite() && cli.light_intensity > 0.0) {
            return Err(invalid(
                "light_intensity",
                format!("must be a finite value greater than 0, got {}", cli.light_intensity),
            ));
        }
        if !(cli.image_saturation.is_finite() && cli.image_saturation >= 0.0) {
            return Err(invalid(
                "image_saturation",
                format!("must be a finite non-negative value, got {}", cli.image_saturation),
            ));
        }

        let initial_camera_pose = if cli.set_initial_camera_pose {
            Some(parse_matrix_literal(&cli.camera_pose)?)
        } else {
            None
        };
        let light_color = parse_color_literal(&cli.light_color)?;

        let config = Self {
            mesh_path: cli.obj_path.clone(),
            gif_path: cli.gif_path.clone(),
            frames_dir: cli.frames_folder_path.clone(),
            width: cli.image_width,
            height: cli.image_height,
            num_frames: cli.num_frames,
            frame_duration,
            loop_count: cli.image_loops,
            initial_camera_pose,
            light_intensity: cli.light_intensity,
            light_color,
            saturation: cli.image_saturation,
        };
        debug!("Configuration: {:?}", config);
        Ok(config)
    }
}

fn invalid(flag: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        flag,
        reason: reason.into(),
    }
}

fn positive_seconds(seconds: f64) -> Result<Duration, ConfigError> {
    if !(seconds.is_finite() && seconds > 0.0) {
        return Err(invalid(
            "image_duration",
            format!("must be a finite number of seconds greater than 0, got {}", seconds),
        ));
    }
    Duration::try_from_secs_f64(seconds).map_err(|e| invalid("image_duration", e.to_string()))
}

/// Parse a row-major 4x4 literal such as `[[1,0,0,0],[0,1,0,0],[0,0,1,0],[0,0,0,1]]`
/// into a camera-to-world matrix.
pub fn parse_matrix_literal(literal: &str) -> Result<Mat4, ConfigError> {
    let malformed = |reason: String| ConfigError::MalformedMatrix {
        literal: literal.to_string(),
        reason,
    };

    let value = Literal::parse(literal).map_err(malformed)?;
    let rows = value
        .as_list()
        .ok_or_else(|| malformed("expected a list of 4 rows".into()))?;
    if rows.len() != 4 {
        return Err(malformed(format!("expected 4 rows, found {}", rows.len())));
    }

    let mut matrix = [[0.0f32; 4]; 4];
    for (i, row) in rows.iter().enumerate() {
        let numbers = row
            .as_numbers()
            .ok_or_else(|| malformed(format!("row {} is not a list of numbers", i)))?;
        if numbers.len() != 4 {
            return Err(malformed(format!("row {} has {} entries, expected 4", i, numbers.len())));
        }
        for (j, number) in numbers.into_iter().enumerate() {
            matrix[i][j] = number as f32;
        }
    }

    // glam stores columns; the literal lists rows
    Ok(Mat4::from_cols_array_2d(&matrix).transpose())
}

/// Parse an RGB literal such as `[1.0, 0.5, 0.0]` with components in [0, 1]
pub fn parse_color_literal(literal: &str) -> Result<[f32; 3], ConfigError> {
    let malformed = |reason: String| ConfigError::MalformedColor {
        literal: literal.to_string(),
        reason,
    };

    let numbers = Literal::parse(literal)
        .map_err(malformed)?
        .as_numbers()
        .ok_or_else(|| malformed("expected a list of 3 numbers".into()))?;
    let [r, g, b] = numbers[..] else {
        return Err(malformed(format!("expected 3 components, found {}", numbers.len())));
    };

    let color = [r as f32, g as f32, b as f32];
    if let Some(c) = color.iter().find(|c| !(0.0..=1.0).contains(*c)) {
        return Err(malformed(format!("component {} is outside [0, 1]", c)));
    }
    Ok(color)
}

/// Nested numeric list, the only shape pose and color literals take
#[derive(Debug, Clone, PartialEq)]
enum Literal {
    Number(f64),
    List(Vec<Literal>),
}

impl Literal {
    fn parse(text: &str) -> Result<Self, String> {
        let mut parser = LiteralParser {
            chars: text.char_indices().peekable(),
            text,
        };
        let value = parser.value()?;
        parser.skip_whitespace();
        match parser.chars.peek() {
            None => Ok(value),
            Some(&(pos, c)) => Err(format!("unexpected {:?} at offset {}", c, pos)),
        }
    }

    fn as_list(&self) -> Option<&[Literal]> {
        match self {
            Literal::List(items) => Some(items),
            Literal::Number(_) => None,
        }
    }

    fn as_numbers(&self) -> Option<Vec<f64>> {
        self.as_list()?
            .iter()
            .map(|item| match item {
                Literal::Number(n) => Some(*n),
                Literal::List(_) => None,
            })
            .collect()
    }
}

struct LiteralParser<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    text: &'a str,
}

impl LiteralParser<'_> {
    fn skip_whitespace(&mut self) {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
    }

    fn value(&mut self) -> Result<Literal, String> {
        self.skip_whitespace();
        match self.chars.peek().copied() {
            Some((_, open @ ('[' | '('))) => {
                self.chars.next();
                self.list(if open == '[' { ']' } else { ')' })
            }
            Some((start, _)) => self.number(start),
            None => Err("unexpected end of input".into()),
        }
    }

    fn list(&mut self, close: char) -> Result<Literal, String> {
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            if self.chars.next_if(|&(_, c)| c == close).is_some() {
                return Ok(Literal::List(items));
            }
            items.push(self.value()?);
            self.skip_whitespace();
            match self.chars.next() {
                Some((_, ',')) => {}
                Some((_, c)) if c == close => return Ok(Literal::List(items)),
                Some((pos, c)) => return Err(format!("expected ',' or {:?} at offset {}, found {:?}", close, pos, c)),
                None => return Err(format!("missing closing {:?}", close)),
            }
        }
    }

    fn number(&mut self, start: usize) -> Result<Literal, String> {
        let mut end = start;
        while let Some((pos, c)) = self
            .chars
            .next_if(|&(_, c)| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+'))
        {
            end = pos + c.len_utf8();
        }
        let token = &self.text[start..end];
        if token.is_empty() {
            let found = self.text[start..].chars().next().unwrap_or(' ');
            return Err(format!("unexpected {:?} at offset {}", found, start));
        }

        match token.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(Literal::Number(n)),
            _ => Err(format!("{:?} is not a finite number", token)),
        }
    }
}

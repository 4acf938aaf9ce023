use std::path::PathBuf;

use clap::Parser;
use harmonograph::{export, AspectRatio, LayerRole, Seed, Session, SessionConfig};
use pixels::{Pixels, SurfaceTexture};
use winit::{
    dpi::LogicalSize,
    event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::WindowBuilder,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Perpetual noise harmonograph", long_about = None)]
struct Args {
    /// Seed token. A random one is minted when absent.
    #[arg(long)]
    token: Option<String>,

    /// Initial canvas shape
    #[arg(long, value_enum, default_value_t = AspectRatio::Square)]
    aspect: AspectRatio,

    /// Raster pixels per reference unit (1.0 renders 2160 px squares)
    #[arg(long, default_value_t = 0.25)]
    scale: f64,

    /// Where snapshots are written
    #[arg(long, default_value = ".")]
    snapshot_dir: PathBuf,

    /// Render this many ticks without a window, save one PNG and exit
    #[arg(long)]
    headless: Option<u64>,

    /// Output file for headless mode. Defaults to a timestamped file in the snapshot dir.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Save a snapshot once when this frame is reached; 0 (the default) disables it
    #[arg(long, default_value_t = 0)]
    preview_frame: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if !(args.scale > 0.0 && args.scale <= 4.0) {
        return Err(format!("scale must be in (0, 4], got {}", args.scale).into());
    }

    let seed = match &args.token {
        Some(token) => Seed::from_token(token.clone()),
        None => Seed::generate(),
    };
    let config = SessionConfig {
        aspect: args.aspect,
        scale: args.scale,
    };
    let mut session = Session::new(seed, config);

    match args.headless {
        Some(frames) => run_headless(&mut session, frames, &args),
        None => run_window(session, args),
    }
}

fn run_headless(session: &mut Session, frames: u64, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    for _ in 0..frames {
        session.tick();
    }
    let frame = session.composite_frame();
    match &args.output {
        Some(path) => export::save_png(frame, path)?,
        None => {
            session.snapshot(&args.snapshot_dir)?;
        }
    }
    Ok(())
}

/// A control-surface command decoded from a key press.
enum Command {
    Toggle(LayerRole),
    ShowAll,
    Aspect(AspectRatio),
    Pause,
    Snapshot,
    Quit,
}

fn command_for(input: KeyboardInput) -> Option<Command> {
    if input.state != ElementState::Pressed {
        return None;
    }
    let command = match input.virtual_keycode? {
        VirtualKeyCode::Key1 => Command::Toggle(LayerRole::Background),
        VirtualKeyCode::Key2 => Command::Toggle(LayerRole::FlowField),
        VirtualKeyCode::Key3 => Command::Toggle(LayerRole::Trace),
        VirtualKeyCode::Key0 => Command::ShowAll,
        VirtualKeyCode::Key4 => Command::Aspect(AspectRatio::Square),
        VirtualKeyCode::Key5 => Command::Aspect(AspectRatio::Landscape),
        VirtualKeyCode::Key6 => Command::Aspect(AspectRatio::Portrait),
        VirtualKeyCode::P => Command::Pause,
        VirtualKeyCode::S => Command::Snapshot,
        VirtualKeyCode::Escape => Command::Quit,
        _ => return None,
    };
    Some(command)
}

fn run_window(mut session: Session, args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let event_loop = EventLoop::new();
    let (width, height) = session.viewport().pixel_size();
    let window = {
        let size = LogicalSize::new(width as f64, height as f64);
        WindowBuilder::new()
            .with_title("Perpetual Noise Harmonograph")
            .with_inner_size(size)
            .build(&event_loop)?
    };

    let window_size = window.inner_size();
    let surface_texture = SurfaceTexture::new(window_size.width, window_size.height, &window);
    let mut pixels = Pixels::new(width, height, surface_texture)?;
    let mut previewed = false;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        match event {
            Event::WindowEvent {
                event: WindowEvent::CloseRequested,
                ..
            } => {
                *control_flow = ControlFlow::Exit;
            }
            Event::WindowEvent {
                event: WindowEvent::KeyboardInput { input, .. },
                ..
            } => match command_for(input) {
                Some(Command::Toggle(role)) => {
                    session.toggle_layer(role);
                }
                Some(Command::ShowAll) => session.show_all(),
                Some(Command::Aspect(aspect)) => {
                    if session.set_aspect(aspect) {
                        let (w, h) = session.viewport().pixel_size();
                        if let Err(err) = pixels.resize_buffer(w, h) {
                            log::error!("pixels.resize_buffer() failed: {}", err);
                            *control_flow = ControlFlow::Exit;
                        }
                    }
                }
                Some(Command::Pause) => {
                    session.toggle_pause();
                }
                Some(Command::Snapshot) => {
                    if let Err(err) = session.snapshot(&args.snapshot_dir) {
                        log::warn!("snapshot failed: {}", err);
                    }
                }
                Some(Command::Quit) => *control_flow = ControlFlow::Exit,
                None => {}
            },
            Event::WindowEvent {
                event: WindowEvent::Resized(size),
                ..
            } => {
                if let Err(err) = pixels.resize_surface(size.width, size.height) {
                    log::error!("pixels.resize_surface() failed: {}", err);
                    *control_flow = ControlFlow::Exit;
                }
            }
            Event::MainEventsCleared => {
                session.tick();
                let frame = session.composite_frame();
                let target = pixels.frame_mut();
                if target.len() == frame.as_bytes().len() {
                    target.copy_from_slice(frame.as_bytes());
                }

                if !previewed && args.preview_frame > 0 && session.ticks() >= args.preview_frame {
                    previewed = true;
                    if let Err(err) = session.snapshot(&args.snapshot_dir) {
                        log::warn!("preview snapshot failed: {}", err);
                    }
                }

                if let Err(err) = pixels.render() {
                    log::error!("pixels.render() failed: {}", err);
                    *control_flow = ControlFlow::Exit;
                }
            }
            _ => {}
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_write_nothing_unasked() {
        let args = Args::try_parse_from(["harmonograph"]).unwrap();
        assert_eq!(args.preview_frame, 0);
        assert!(args.headless.is_none());
        assert!(args.output.is_none());
        assert_eq!(args.aspect, AspectRatio::Square);
    }

    #[test]
    fn test_preview_frame_is_opt_in() {
        let args = Args::try_parse_from(["harmonograph", "--preview-frame", "600", "--aspect", "portrait"]).unwrap();
        assert_eq!(args.preview_frame, 600);
        assert_eq!(args.aspect, AspectRatio::Portrait);
    }
}

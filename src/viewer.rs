use glam::{Mat4, Quat, Vec3};
use image::DynamicImage;
use log::{debug, error, info};
use std::sync::mpsc;
use std::sync::{Arc, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::camera::{MovementState, OrbitCamera};
use crate::core::input::WinitController;
use crate::core::{OffscreenRenderer, PixelSurface};
use crate::error::ViewerError;
use crate::math::AABB;
use crate::scene::{
    lock_scene, DirectionalLight, NodeId, NodeKind, PerspectiveCamera, Scene, SharedScene, DEFAULT_YFOV,
};

const FRAME_INTERVAL: Duration = Duration::from_millis(16);
const WINDOW_TITLE: &str = "Mesh Turntable Viewer";
const FILL_LIGHT_INTENSITY: f64 = 1.0;

/// Messages the owning thread can post into the viewer's event loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewerCommand {
    Close,
}

/// A running viewer that renders a shared scene from a background thread.
pub trait LiveViewer {
    /// The scene the viewer is rendering
    fn scene(&self) -> &SharedScene;

    /// Take the render lock. The viewer cannot draw while the guard is held.
    fn render_lock(&self) -> Result<MutexGuard<'_, Scene>, ViewerError> {
        lock_scene(self.scene())
    }

    /// Stop rendering and release the window and thread
    fn close(self) -> Result<(), ViewerError>;
}

/// Opens viewers. Lets the picker run against a fake in tests.
pub trait ViewerLauncher {
    type Viewer: LiveViewer;

    fn launch(&mut self, scene: SharedScene, viewport: (u32, u32)) -> Result<Self::Viewer, ViewerError>;
}

/// Launches a winit window on a dedicated thread
#[derive(Debug, Default, Clone, Copy)]
pub struct WinitLauncher;

impl ViewerLauncher for WinitLauncher {
    type Viewer = WinitViewer;

    /// Returns once the window is up and the viewer camera is in the scene.
    fn launch(&mut self, scene: SharedScene, viewport: (u32, u32)) -> Result<WinitViewer, ViewerError> {
        let (ready_tx, ready_rx) = mpsc::channel();
        let thread_scene = Arc::clone(&scene);

        let handle = thread::Builder::new()
            .name("viewer".into())
            .spawn(move || run_event_loop(thread_scene, viewport, ready_tx))
            .map_err(|e| ViewerError::EventLoop(e.to_string()))?;

        let (proxy, handle) = await_startup(&ready_rx, handle)?;
        info!("Viewer started at {}x{}", viewport.0, viewport.1);
        Ok(WinitViewer {
            scene,
            proxy,
            thread: Some(handle),
        })
    }
}

/// Sent by the viewer thread once its camera exists, or with the reason it never will
type Startup<T> = Result<T, ViewerError>;

/// Block until the viewer thread reports in. On failure the thread is joined
/// so it never outlives the launch call.
fn await_startup<T>(
    ready: &mpsc::Receiver<Startup<T>>,
    handle: JoinHandle<Result<(), ViewerError>>,
) -> Result<(T, JoinHandle<Result<(), ViewerError>>), ViewerError> {
    match ready.recv() {
        Ok(Ok(value)) => Ok((value, handle)),
        Ok(Err(e)) => {
            if handle.join().is_err() {
                error!("Viewer thread panicked after a failed start");
            }
            Err(e)
        }
        // The thread hung up without reporting, so it has already failed
        Err(_) => match handle.join() {
            Ok(Err(e)) => Err(e),
            Ok(Ok(())) => Err(ViewerError::EventLoop("event loop exited during startup".into())),
            Err(_) => Err(ViewerError::ThreadPanicked),
        },
    }
}

pub struct WinitViewer {
    scene: SharedScene,
    proxy: EventLoopProxy<ViewerCommand>,
    thread: Option<JoinHandle<Result<(), ViewerError>>>,
}

impl WinitViewer {
    fn shutdown(&mut self) -> Result<(), ViewerError> {
        let Some(handle) = self.thread.take() else {
            return Ok(());
        };
        if self.proxy.send_event(ViewerCommand::Close).is_err() {
            debug!("Viewer event loop already exited");
        }
        handle.join().map_err(|_| ViewerError::ThreadPanicked)?
    }
}

impl LiveViewer for WinitViewer {
    fn scene(&self) -> &SharedScene {
        &self.scene
    }

    fn close(mut self) -> Result<(), ViewerError> {
        self.shutdown()?;
        info!("Viewer closed");
        Ok(())
    }
}

impl Drop for WinitViewer {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            error!("Viewer shutdown failed: {}", e);
        }
    }
}

fn run_event_loop(
    scene: SharedScene,
    viewport: (u32, u32),
    ready: mpsc::Sender<Startup<EventLoopProxy<ViewerCommand>>>,
) -> Result<(), ViewerError> {
    let event_loop = build_event_loop()?;
    let proxy = event_loop.create_proxy();

    let mut app = ViewerApp::new(scene, viewport, ready, proxy);
    event_loop
        .run_app(&mut app)
        .map_err(|e| ViewerError::EventLoop(e.to_string()))?;
    app.finish()
}

#[cfg(target_os = "macos")]
fn build_event_loop() -> Result<EventLoop<ViewerCommand>, ViewerError> {
    // AppKit only runs its event loop on the main thread
    Err(ViewerError::UnsupportedPlatform)
}

#[cfg(not(target_os = "macos"))]
fn build_event_loop() -> Result<EventLoop<ViewerCommand>, ViewerError> {
    let mut builder = EventLoop::<ViewerCommand>::with_user_event();

    #[cfg(all(unix, not(any(target_os = "ios", target_os = "android"))))]
    {
        use winit::platform::x11::EventLoopBuilderExtX11;
        builder.with_any_thread(true);
    }
    #[cfg(target_os = "windows")]
    {
        use winit::platform::windows::EventLoopBuilderExtWindows;
        builder.with_any_thread(true);
    }

    builder
        .build()
        .map_err(|e| ViewerError::EventLoop(e.to_string()))
}

/// Starting orbit and pose for the viewer camera.
///
/// A seeded camera is adopted exactly so the viewer camera matches it until
/// the operator moves. Otherwise the camera frames the mesh from +Z.
pub fn initial_view(scene: &Scene) -> (OrbitCamera, Mat4) {
    let bounds = scene
        .mesh_bounds()
        .unwrap_or_else(|| AABB::new(Vec3::splat(-0.5), Vec3::splat(0.5)));

    match scene.main_camera().and_then(|id| scene.pose(id)) {
        Some(pose) => (OrbitCamera::from_pose(&pose, bounds.center()), pose),
        None => {
            let orbit = OrbitCamera::framing(&bounds, DEFAULT_YFOV);
            (orbit, orbit.pose())
        }
    }
}

/// Three white lights that ride with the viewer camera so every visible side
/// of the mesh reads in the preview. They sit 30 degrees off the view axis,
/// 120 degrees apart, and never enter the shared scene.
pub fn fill_lights(camera_pose: &Mat4) -> [(Mat4, DirectionalLight); 3] {
    let tilt = std::f32::consts::FRAC_PI_6;
    [0.0f32, 2.0, 4.0].map(|sixths| {
        let spin = sixths * std::f32::consts::FRAC_PI_3;
        // Where the light sits in camera space; it shines back along this axis
        let seat = Vec3::new(tilt.sin() * spin.cos(), tilt.sin() * spin.sin(), tilt.cos());
        let pose = *camera_pose * Mat4::from_quat(Quat::from_rotation_arc(Vec3::Z, seat));
        (pose, DirectionalLight::new([1.0, 1.0, 1.0], FILL_LIGHT_INTENSITY))
    })
}

struct ViewerApp {
    scene: SharedScene,
    viewport: (u32, u32),
    /// Taken on the first `resumed`, after which the launcher has its answer
    ready: Option<(mpsc::Sender<Startup<EventLoopProxy<ViewerCommand>>>, EventLoopProxy<ViewerCommand>)>,
    window: Option<Arc<Window>>,
    surface: Option<PixelSurface>,
    renderer: Option<OffscreenRenderer>,
    camera_node: Option<NodeId>,
    orbit: OrbitCamera,
    controller: WinitController,
    camera_moved: bool,
    drawn_revision: Option<u64>,
    last_frame_time: Instant,
    error: Option<ViewerError>,
}

impl ViewerApp {
    fn new(
        scene: SharedScene,
        viewport: (u32, u32),
        ready: mpsc::Sender<Startup<EventLoopProxy<ViewerCommand>>>,
        proxy: EventLoopProxy<ViewerCommand>,
    ) -> Self {
        Self {
            scene,
            viewport,
            ready: Some((ready, proxy)),
            window: None,
            surface: None,
            renderer: None,
            camera_node: None,
            orbit: OrbitCamera::framing(&AABB::new(Vec3::splat(-0.5), Vec3::splat(0.5)), DEFAULT_YFOV),
            controller: WinitController::new(),
            camera_moved: false,
            drawn_revision: None,
            last_frame_time: Instant::now(),
            error: None,
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), ViewerError> {
        let (width, height) = self.viewport;
        let window = event_loop
            .create_window(
                Window::default_attributes()
                    .with_title(WINDOW_TITLE)
                    .with_inner_size(PhysicalSize::new(width, height)),
            )
            .map(Arc::new)
            .map_err(|e| ViewerError::EventLoop(format!("failed to create window: {}", e)))?;

        let surface = PixelSurface::new(window.clone(), width, height)?;
        let renderer = OffscreenRenderer::new(width, height)?;

        let camera_node = {
            let mut scene = lock_scene(&self.scene)?;
            let (orbit, pose) = initial_view(&scene);
            self.orbit = orbit;
            scene.add(NodeKind::Camera(PerspectiveCamera::default()), pose)
        };
        debug!("Viewer camera is node {}", camera_node.index());

        self.window = Some(window);
        self.surface = Some(surface);
        self.renderer = Some(renderer);
        self.camera_node = Some(camera_node);
        Ok(())
    }

    fn redraw(&mut self) -> Result<(), ViewerError> {
        let (Some(surface), Some(renderer), Some(camera_node)) =
            (self.surface.as_ref(), self.renderer.as_ref(), self.camera_node)
        else {
            return Ok(());
        };

        let frame = {
            let mut scene = lock_scene(&self.scene)?;
            if self.camera_moved {
                scene.set_pose(camera_node, self.orbit.pose())?;
                self.camera_moved = false;
            }
            if self.drawn_revision == Some(scene.revision()) {
                return Ok(());
            }
            self.drawn_revision = Some(scene.revision());
            let camera_pose = scene.pose(camera_node).unwrap_or(Mat4::IDENTITY);
            renderer.render_lit(&scene, camera_node, &fill_lights(&camera_pose))?
        };

        let rgba = DynamicImage::ImageRgb8(frame).into_rgba8();
        surface.draw(rgba.as_raw())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: ViewerError) {
        error!("Viewer error: {}", err);
        self.error.get_or_insert(err);
        event_loop.exit();
    }

    fn finish(self) -> Result<(), ViewerError> {
        self.error.map_or(Ok(()), Err)
    }
}

impl ApplicationHandler<ViewerCommand> for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let started = self.init(event_loop);
        let Some((ready, proxy)) = self.ready.take() else {
            if let Err(e) = started {
                self.fail(event_loop, e);
            }
            return;
        };

        match started {
            Ok(()) => {
                if ready.send(Ok(proxy)).is_err() {
                    // Launcher is gone, nobody to render for
                    event_loop.exit();
                }
            }
            Err(e) => {
                error!("Viewer failed to start: {}", e);
                if let Err(mpsc::SendError(Err(e))) = ready.send(Err(e)) {
                    self.error.get_or_insert(e);
                }
                event_loop.exit();
            }
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: ViewerCommand) {
        match event {
            ViewerCommand::Close => event_loop.exit(),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => {
                info!("Viewer window closed by operator");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(surface) = self.surface.as_mut() {
                    surface.resize(size.width, size.height);
                    self.drawn_revision = None;
                }
            }
            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw() {
                    self.fail(event_loop, e);
                }
            }
            other => self.controller.process_event(&other),
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let delta = now.duration_since(self.last_frame_time).as_secs_f32();
        self.last_frame_time = now;

        let movement = MovementState::from_controller(&self.controller);
        let (dx, dy) = self.controller.take_drag();
        let orbited = self.orbit.update(&movement, delta);
        let dragged = self.orbit.drag(dx, dy);
        if orbited || dragged {
            self.camera_moved = true;
        }

        if let Some(window) = &self.window {
            window.request_redraw();
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(now + FRAME_INTERVAL));
    }
}

use anyhow::{Context as _, Result};
use frice::game::anim::{AccelerateRotate, AnimExt, SimpleMove};
use frice::game::event::{KeyCode, KeyListener, MouseButton, MouseEvent, MouseEventKind};
use frice::game::object::GameObject;
use frice::{Color, Context, EngineConfig, Game, Rect, Shape};

/// Two ovals spinning up in opposite directions. Space pauses, Escape
/// quits, clicking launches a small oval that leaves the screen.
struct SpinDemo;

impl Game for SpinDemo {
    fn name(&self) -> &str {
        "Spin Demo"
    }

    fn on_init(&mut self, ctx: &mut Context) {
        let bounds = ctx.bounds();
        ctx.active_area = Some(Rect::new(0.0, 0.0, bounds.width, bounds.height));
        let tint = Color::from_argb(0x7F78_1895);
        for alpha in [3.0, -3.0] {
            ctx.add_object(
                GameObject::shape(tint, Shape::oval(20.0, 40.0), 80.0, 60.0)
                    .with_anim(AccelerateRotate::new(alpha)),
            );
        }

        ctx.add_key_listener(KeyListener::pressed(KeyCode::Space, |ctx, _| {
            let paused = !ctx.is_paused();
            ctx.set_paused(paused);
        }));
        ctx.add_key_listener(KeyListener::pressed(KeyCode::Escape, |ctx, _| ctx.exit()));
    }

    fn on_mouse(&mut self, ctx: &mut Context, event: &MouseEvent) {
        if event.kind != MouseEventKind::Clicked || event.button != Some(MouseButton::Left) {
            return;
        }
        ctx.add_object(
            GameObject::shape(Color::BLUE, Shape::oval(6.0, 6.0), event.x, event.y)
                .with_anim(SimpleMove::new(0.0, -120.0).limit(10_000)),
        );
    }
}

fn main() -> Result<()> {
    init_tracing();

    let config = EngineConfig::from_env().context("failed to load engine config")?;
    frice::launch(SpinDemo, config).context("engine stopped with an error")
}

fn init_tracing() {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("tracing subscriber already set");
    }
}

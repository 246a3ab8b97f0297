use serde_json::json;
use stage_engine::{ComponentDb, Hook, HookError, ScriptClass, ANIMATION_TYPE, RIGIDBODY_TYPE};

pub(crate) const EXPIRED_EVENT: &str = "ActorExpired";

pub(crate) fn component_db() -> ComponentDb {
    let mut db = ComponentDb::default();
    for class in [spinner(), lifetime(), spawner(), score_keeper(), autoplay()] {
        db.register_script_class(class);
    }
    db
}

/// Turns the owner's rigidbody at `speed` degrees per second.
fn spinner() -> ScriptClass {
    ScriptClass::new("Spinner")
        .with_default("speed", 90.0)
        .on_hook(Hook::Update, |this, _, ctx| {
            let owner = ctx.actor_id();
            let Some(rigidbody) = ctx.get_component(owner, RIGIDBODY_TYPE) else {
                return Ok(());
            };
            let Some(body) = ctx.body_of(&rigidbody) else {
                return Ok(());
            };
            let speed = this.get_f64("speed").unwrap_or(0.0) as f32;
            let rotation = ctx.physics().rotation_degrees(body).unwrap_or(0.0);
            ctx.physics_mut()
                .set_rotation_degrees(body, rotation + speed / 60.0);
            Ok(())
        })
}

/// Counts `frames` down, then announces the owner's expiry and destroys it.
fn lifetime() -> ScriptClass {
    ScriptClass::new("Lifetime")
        .with_default("frames", 120)
        .on_hook(Hook::Update, |this, _, ctx| {
            let remaining = this.get_i64("frames").unwrap_or(0).saturating_sub(1);
            this.set("frames", remaining);
            if remaining > 0 {
                return Ok(());
            }
            let owner = ctx.actor_id();
            let payload = json!({ "actor": owner.0, "name": ctx.own_name() });
            ctx.publish(EXPIRED_EVENT, &payload)?;
            ctx.destroy(owner);
            Ok(())
        })
}

fn spawner() -> ScriptClass {
    ScriptClass::new("Spawner")
        .with_default("template", "")
        .with_default("interval", 60)
        .with_default("max", 5)
        .with_default("elapsed", 0)
        .with_default("spawned", 0)
        .on_hook(Hook::Update, |this, _, ctx| {
            let elapsed = this.get_i64("elapsed").unwrap_or(0).saturating_add(1);
            let spawned = this.get_i64("spawned").unwrap_or(0);
            if spawned >= this.get_i64("max").unwrap_or(0) {
                return Ok(());
            }
            if elapsed < this.get_i64("interval").unwrap_or(1) {
                this.set("elapsed", elapsed);
                return Ok(());
            }
            this.set("elapsed", 0);

            let template = this.get_str("template").unwrap_or_default().to_string();
            if template.is_empty() {
                return Err(HookError::script("Spawner has no template"));
            }
            ctx.instantiate(&template)?;
            this.set("spawned", spawned.saturating_add(1));
            Ok(())
        })
}

/// Survives scene loads, counts expiries and quits once `target` is reached.
fn score_keeper() -> ScriptClass {
    ScriptClass::new("ScoreKeeper")
        .with_default("score", 0)
        .with_default("target", 3)
        .on_hook(Hook::Start, |_, _, ctx| {
            let owner = ctx.actor_id();
            ctx.dont_destroy(owner);
            ctx.subscribe(EXPIRED_EVENT, "OnActorExpired");
            Ok(())
        })
        .on("OnActorExpired", |this, args, ctx| {
            let score = this.get_i64("score").unwrap_or(0).saturating_add(1);
            this.set("score", score);
            let name = args
                .event()
                .and_then(|payload| payload["name"].as_str())
                .unwrap_or("unknown");
            ctx.log(&format!("{name} expired, score {score}"));

            let target = this.get_i64("target").unwrap_or(0);
            if target > 0 && score >= target {
                ctx.log("target reached");
                ctx.request_quit();
            }
            Ok(())
        })
}

/// Plays `clip` on the owner's animation as soon as it starts.
fn autoplay() -> ScriptClass {
    ScriptClass::new("Autoplay")
        .with_default("clip", "idle")
        .on_hook(Hook::Start, |this, _, ctx| {
            let owner = ctx.actor_id();
            let Some(animation) = ctx.get_component(owner, ANIMATION_TYPE) else {
                ctx.log_error("Autoplay needs an Animation on the same actor");
                return Ok(());
            };
            let clip = this.get_str("clip").unwrap_or("idle").to_string();
            ctx.play_animation(&animation, &clip);
            Ok(())
        })
}

#[cfg(test)]
mod tests {
    use serde_json::Value;
    use stage_engine::{
        ActorBlueprint, ActorId, ComponentBlueprint, ComponentInstance, ComponentRef, FrameDriver,
        World,
    };

    use super::*;

    fn run_frames(world: &mut World, count: usize) {
        let mut driver = FrameDriver::default();
        for _ in 0..count {
            driver.run_frame(world).expect("frame");
        }
    }

    fn spawn_live(world: &mut World, blueprint: ActorBlueprint) -> ActorId {
        let id = world.spawn(&blueprint).expect("spawn");
        world.frame_end();
        id
    }

    fn field(world: &World, actor: ActorId, key: &str, name: &str) -> Option<Value> {
        world
            .component(&ComponentRef::new(actor, key))
            .and_then(ComponentInstance::script)
            .and_then(|script| script.get(name).cloned())
    }

    fn score_keeper_actor(target: i64) -> ActorBlueprint {
        ActorBlueprint::named("score").with_component(
            "keeper",
            ComponentBlueprint::typed("ScoreKeeper").with("target", target),
        )
    }

    #[test]
    fn lifetime_expiry_is_scored_and_destroys_the_owner() {
        let mut world = World::new(component_db());
        let keeper = spawn_live(&mut world, score_keeper_actor(5));
        spawn_live(
            &mut world,
            ActorBlueprint::named("moth")
                .with_component("life", ComponentBlueprint::typed("Lifetime").with("frames", 2)),
        );

        run_frames(&mut world, 3);

        assert!(world.find("moth").is_none());
        assert_eq!(field(&world, keeper, "keeper", "score"), Some(Value::from(1)));
        assert!(!world.quit_requested());
    }

    #[test]
    fn score_keeper_requests_quit_at_target() {
        let mut world = World::new(component_db());
        spawn_live(&mut world, score_keeper_actor(2));
        for name in ["first", "second"] {
            spawn_live(
                &mut world,
                ActorBlueprint::named(name)
                    .with_component("life", ComponentBlueprint::typed("Lifetime").with("frames", 2)),
            );
        }

        run_frames(&mut world, 2);

        assert!(world.quit_requested());
    }

    #[test]
    fn spawner_instantiates_on_interval_up_to_max() {
        let mut world = World::new(component_db());
        world
            .templates_mut()
            .register("Firefly", ActorBlueprint::named("firefly"));
        spawn_live(
            &mut world,
            ActorBlueprint::named("nest").with_component(
                "spawn",
                ComponentBlueprint::typed("Spawner")
                    .with("template", "Firefly")
                    .with("interval", 1)
                    .with("max", 2),
            ),
        );

        run_frames(&mut world, 4);

        assert_eq!(world.find_all("firefly").len(), 2);
    }

    #[test]
    fn spawner_without_template_reports_a_script_failure() {
        let mut world = World::new(component_db());
        spawn_live(
            &mut world,
            ActorBlueprint::named("nest").with_component(
                "spawn",
                ComponentBlueprint::typed("Spawner").with("interval", 1),
            ),
        );

        let report = FrameDriver::default()
            .run_frame(&mut world)
            .expect("frame");

        assert_eq!(report.script_failures.len(), 1);
        assert_eq!(report.script_failures[0].message, "Spawner has no template");
    }

    #[test]
    fn spinner_turns_its_rigidbody() {
        let mut world = World::new(component_db());
        let id = spawn_live(
            &mut world,
            ActorBlueprint::named("wheel")
                .with_component("body", ComponentBlueprint::typed(RIGIDBODY_TYPE))
                .with_component("spin", ComponentBlueprint::typed("Spinner").with("speed", 60.0)),
        );

        run_frames(&mut world, 3);

        let rigidbody = world.get_component(id, RIGIDBODY_TYPE).expect("rigidbody");
        let body = world
            .component(&rigidbody)
            .and_then(|instance| instance.downcast_ref::<stage_engine::Rigidbody>())
            .and_then(stage_engine::Rigidbody::body)
            .expect("body");
        let rotation = world.physics().rotation_degrees(body).expect("rotation");
        assert!((rotation - 3.0).abs() < 0.001);
    }

    #[test]
    fn autoplay_starts_the_owner_animation() {
        let mut world = World::new(component_db());
        let id = spawn_live(
            &mut world,
            ActorBlueprint::named("lamp")
                .with_component("anim", ComponentBlueprint::typed(ANIMATION_TYPE))
                .with_component("play", ComponentBlueprint::typed("Autoplay").with("clip", "glow")),
        );

        run_frames(&mut world, 1);

        assert!(world.renderables().contains(&ComponentRef::new(id, "anim")));
    }
}

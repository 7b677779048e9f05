use std::{fs, io};

use bvh::scene;

fn main() -> anyhow::Result<()> {
    simple_logger::SimpleLogger::new().init()?;

    let parsed = clap::Command::new(env!("CARGO_BIN_NAME"))
        .arg(
            clap::Arg::new("scene")
                .long("scene")
                .number_of_values(1)
                .required(true))
        .arg(
            clap::Arg::new("upload")
                .long("upload")
                .action(clap::ArgAction::SetTrue))
        .get_matches();

    let scene_reader = io::BufReader::new({
        fs::File::open(parsed.get_one::<String>("scene").unwrap())?
    });

    let desc: scene::SceneDesc = //
        serde_json::from_reader(scene_reader)?;

    let prims = desc.prims();

    let mut accel = bvh::Accelerator::new();

    for prim in &prims {
        accel.add_primitive(prim)?;
    }

    for mesh in &desc.meshes {
        let obj = wavefront::Obj::from_file(&mesh.path)?;

        accel.add_mesh(
            &scene::Mesh::from_obj(&obj),
            &mesh.transform,
            mesh.material,
        )?;
    }

    accel.build(bvh::Purpose::Generic);

    println!("{}", serde_json::to_string_pretty(&accel.stats())?);

    if *parsed.get_one::<bool>("upload").unwrap() {
        pollster::block_on(upload(&accel))?;
    }

    Ok(())
}

// Exercises the storage-buffer path against whatever adapter the
// machine offers; no surface is involved
async fn upload(accel: &bvh::Accelerator<'_>) -> anyhow::Result<()> {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());

    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions::default())
        .await
        .ok_or_else(|| anyhow::anyhow!("No suitable adapter found"))?;

    let device_desc = wgpu::DeviceDescriptor {
        label: None,
        required_features: wgpu::Features::empty(),
        required_limits: wgpu::Limits::default(),
    };

    let (device, _queue) = adapter.request_device(&device_desc, None).await?;

    let _pack = accel.pack(&device)?;

    log::info!("uploaded node and primitive buffers");

    Ok(())
}

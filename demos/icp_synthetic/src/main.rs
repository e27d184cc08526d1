use argh::FromArgs;
use rand::{rngs::StdRng, Rng, SeedableRng};

use scanreg::icp::{self, IcpConfig, PointCloud, RobustKernel};
use scanreg::lie::Pose;

#[derive(FromArgs)]
/// Register a synthetic point cloud against a moved, noisy copy of itself
struct Args {
    /// number of points of the source cloud
    #[argh(option, default = "2000")]
    num_points: usize,

    /// half-width of the uniform noise added to the target points
    #[argh(option, default = "0.002")]
    noise: f64,

    /// number of outliers added to the source cloud
    #[argh(option, default = "50")]
    outliers: usize,

    /// number of ICP iterations
    #[argh(option, default = "30")]
    iterations: usize,

    /// squared error above which correspondences are downweighted
    #[argh(option, default = "0.01")]
    kernel_threshold: f64,

    /// robust kernel: huber, cauchy or truncated
    #[argh(option, default = "RobustKernel::Huber", from_str_fn(parse_kernel))]
    kernel: RobustKernel,

    /// rotation of the motion around z, in radians
    #[argh(option, default = "0.05")]
    angle: f64,

    /// translation of the motion along x and y
    #[argh(option, default = "0.05")]
    shift: f64,

    /// seed of the random generator
    #[argh(option, default = "42")]
    seed: u64,
}

fn parse_kernel(value: &str) -> Result<RobustKernel, String> {
    match value {
        "huber" => Ok(RobustKernel::Huber),
        "cauchy" => Ok(RobustKernel::Cauchy),
        "truncated" => Ok(RobustKernel::Truncated),
        _ => Err(format!("unknown kernel: {value}")),
    }
}

/// Points sampled on the floor and two walls of a box.
fn sample_room(rng: &mut StdRng, num_points: usize) -> Vec<[f64; 3]> {
    (0..num_points)
        .map(|i| {
            let (u, v) = (rng.random_range(-2.0..2.0), rng.random_range(0.0..2.0));
            match i % 3 {
                0 => [u, v - 1.0, 0.0],
                1 => [u, 1.0, v],
                _ => [2.0, u / 2.0, v],
            }
        })
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();

    let mut rng = StdRng::seed_from_u64(args.seed);

    let points = sample_room(&mut rng, args.num_points);
    let motion = Pose::exp(&[0.0, 0.0, args.angle, args.shift, args.shift, 0.0]);

    let target = motion
        .transform_points(&points)
        .into_iter()
        .map(|p| {
            let mut noisy = p;
            if args.noise > 0.0 {
                for x in noisy.iter_mut() {
                    *x += rng.random_range(-args.noise..args.noise);
                }
            }
            noisy
        })
        .collect::<Vec<_>>();

    let mut source = points;
    for _ in 0..args.outliers {
        source.push([
            rng.random_range(-2.0..2.0),
            rng.random_range(-1.0..1.0),
            rng.random_range(0.3..1.5),
        ]);
    }

    let source = PointCloud::from_vec(source)?;
    let target = PointCloud::from_vec(target)?;
    println!("Source cloud: #{} points", source.num_points());
    println!("Target cloud: #{} points", target.num_points());

    let config = IcpConfig {
        iterations: args.iterations,
        kernel_threshold: args.kernel_threshold,
        kernel: args.kernel,
        ..Default::default()
    };

    let now = std::time::Instant::now();
    let result = icp::align(&source, &target, None, config)?;
    log::info!("registration took {:?}", now.elapsed());

    println!("Estimated pose: {:?}", result.pose.to_array());
    println!("Expected pose:  {:?}", motion.to_array());

    let error = result.pose.inverse() * motion;
    println!(
        "Rotation error: {:.3e} rad, translation error: {:.3e}",
        error.rotation().angle(),
        error.translation().length()
    );
    println!(
        "Iterations: {}, final cost: {:?}, inliers: {:?}",
        result.num_iterations,
        result.final_cost(),
        result.num_inliers.last()
    );

    if let Some(weights) = result.final_weights() {
        let outlier_weights = &weights[args.num_points..];
        if !outlier_weights.is_empty() {
            let mean = outlier_weights.iter().sum::<f64>() / outlier_weights.len() as f64;
            println!("Mean outlier weight: {mean:.3}");
        }
    }

    Ok(())
}

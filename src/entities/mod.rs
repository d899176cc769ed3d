pub mod applied_job;
pub mod attachment;
pub mod category;
pub mod company;
pub mod company_follower;
pub mod job;
pub mod resume;
pub mod saved_job;
pub mod user_profile;

pub use applied_job::Entity as AppliedJob;
pub use attachment::Entity as Attachment;
pub use category::Entity as Category;
pub use company::Entity as Company;
pub use company_follower::Entity as CompanyFollower;
pub use job::Entity as Job;
pub use resume::Entity as Resume;
pub use saved_job::Entity as SavedJob;
pub use user_profile::Entity as UserProfile;
